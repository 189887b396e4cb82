//! Raw socket privileges.
//!
//! On Linux raw `ICMP` sockets need `CAP_NET_RAW` in the effective set; it is
//! raised from the permitted set at startup and the effective set is cleared
//! again once the sockets are open. On other Unix platforms the effective user
//! must be root and nothing is raised or dropped.
//!
//! Unprivileged mode uses `IPPROTO_ICMP` datagram sockets, which need none of this.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(target_os = "linux")]
    #[error("caps error: {0}")]
    CapsError(#[from] caps::errors::CapsError),
}

/// Whether this process may open raw sockets.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Privilege {
    raw_sockets: bool,
}

impl Privilege {
    /// Raise any permitted privileges and discover the result.
    pub fn acquire_privileges() -> Result<Self> {
        platform::raise()?;
        Ok(Self {
            raw_sockets: platform::has_raw_sockets()?,
        })
    }

    #[cfg(test)]
    pub const fn new(raw_sockets: bool) -> Self {
        Self { raw_sockets }
    }

    pub const fn has_privileges(&self) -> bool {
        self.raw_sockets
    }

    /// Give up the privileges raised by [`Privilege::acquire_privileges`].
    pub fn drop_privileges() -> Result<()> {
        platform::relinquish()
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::Result;
    use caps::{CapSet, Capability};

    pub fn raise() -> Result<()> {
        if caps::has_cap(None, CapSet::Permitted, Capability::CAP_NET_RAW)? {
            caps::raise(None, CapSet::Effective, Capability::CAP_NET_RAW)?;
        }
        Ok(())
    }

    pub fn has_raw_sockets() -> Result<bool> {
        Ok(caps::has_cap(None, CapSet::Effective, Capability::CAP_NET_RAW)?)
    }

    pub fn relinquish() -> Result<()> {
        caps::clear(None, CapSet::Effective)?;
        Ok(())
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
#[expect(clippy::unnecessary_wraps)]
mod platform {
    use super::Result;
    use nix::unistd::Uid;

    pub const fn raise() -> Result<()> {
        Ok(())
    }

    pub fn has_raw_sockets() -> Result<bool> {
        Ok(Uid::effective().is_root())
    }

    pub const fn relinquish() -> Result<()> {
        Ok(())
    }
}
