use crate::error::{Error, Result};
use crate::peer::Peer;
use indexmap::IndexMap;
use std::net::IpAddr;

/// The fixed set of monitored peers, keyed by address.
///
/// Built once at startup; peers keep their configured order when iterated.
#[derive(Debug)]
pub struct Registry {
    peers: IndexMap<IpAddr, Peer>,
}

impl Registry {
    /// Build a registry, rejecting duplicate addresses.
    pub fn new(peers: impl IntoIterator<Item = Peer>) -> Result<Self> {
        let mut map = IndexMap::new();
        for peer in peers {
            let addr = peer.addr();
            if map.insert(addr, peer).is_some() {
                return Err(Error::DuplicateHost(addr));
            }
        }
        Ok(Self { peers: map })
    }

    /// The peer whose address is exactly `addr`.
    #[must_use]
    pub fn lookup(&self, addr: IpAddr) -> Option<&Peer> {
        self.peers.get(&addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
