use crate::constants::PAYLOAD_SIZE;
use std::fmt::{Debug, Formatter};

/// `Sequence` newtype.
///
/// Echo sequence numbers wrap at `u16::MAX` and must only be compared with
/// [`Sequence::distance`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Sequence(pub u16);

impl Sequence {
    /// The sequence after this one, wrapping to `0` after `u16::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// How many probes before `self` the `earlier` sequence was sent.
    ///
    /// Computed modulo 65536, so the result is always in `0..=u16::MAX` and
    /// `s.distance(s) == 0`.
    #[must_use]
    pub const fn distance(self, earlier: Self) -> u16 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// `Identifier` newtype.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Identifier(pub u16);

/// The random bytes embedded in every probe sent to a peer.
///
/// A reply is only attributed to a peer if it echoes these bytes exactly.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct IdentityPayload([u8; PAYLOAD_SIZE]);

impl IdentityPayload {
    #[must_use]
    pub const fn new(bytes: [u8; PAYLOAD_SIZE]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.0.as_slice() == bytes
    }
}

impl Debug for IdentityPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", redpress_packet::fmt_payload(&self.0))
    }
}
