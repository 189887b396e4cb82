use crate::types::{IdentityPayload, Identifier, Sequence};
use std::net::IpAddr;
use std::time::SystemTime;

/// An echo request to be sent to a peer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Probe {
    pub addr: IpAddr,
    pub identifier: Identifier,
    pub sequence: Sequence,
    pub payload: IdentityPayload,
}

impl Probe {
    #[must_use]
    pub const fn new(
        addr: IpAddr,
        identifier: Identifier,
        sequence: Sequence,
        payload: IdentityPayload,
    ) -> Self {
        Self {
            addr,
            identifier,
            sequence,
            payload,
        }
    }
}

/// An echo reply read from the network.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EchoReply {
    /// The address the reply came from.
    pub addr: IpAddr,
    pub identifier: Identifier,
    pub sequence: Sequence,
    pub payload: Vec<u8>,
    pub received: SystemTime,
}

impl EchoReply {
    #[must_use]
    pub const fn new(
        addr: IpAddr,
        identifier: Identifier,
        sequence: Sequence,
        payload: Vec<u8>,
        received: SystemTime,
    ) -> Self {
        Self {
            addr,
            identifier,
            sequence,
            payload,
            received,
        }
    }
}
