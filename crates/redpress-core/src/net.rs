use crate::error::Result;
use crate::probe::{EchoReply, Probe};

/// Common types and helper functions.
mod common;

/// IPv4 implementation.
mod ipv4;

/// Platform specific network code.
mod platform;

/// A network socket.
mod socket;

/// A channel for sending and receiving echo messages.
pub mod channel;

/// The platform specific socket type.
pub use platform::SocketImpl;

/// The sending half of the network used by the prober.
#[cfg_attr(test, mockall::automock)]
pub trait ProbeSender: Send {
    /// Send a `Probe`.
    ///
    /// Returns [`crate::Error::ProbeFailed`] if the destination is known to be
    /// unreachable; any other error indicates a transport failure.
    fn send_probe(&mut self, probe: Probe) -> Result<()>;
}

/// The receiving half of the network used by the listener.
#[cfg_attr(test, mockall::automock)]
pub trait ReplyReceiver: Send {
    /// Receive the next echo reply.
    ///
    /// Returns `None` if the read times out or the packet read is not an echo
    /// reply. Malformed packets are returned as [`crate::Error::PacketError`].
    fn recv_reply(&mut self) -> Result<Option<EchoReply>>;
}
