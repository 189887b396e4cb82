use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// The buffer is too small to hold the named packet.
    #[error("insufficient buffer for {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// The `IPv4` header declares a length beyond the bytes received.
    #[error("invalid IPv4 header length {0} for {1} byte packet")]
    InvalidHeaderLength(usize, usize),
}
