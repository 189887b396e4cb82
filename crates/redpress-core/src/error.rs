use std::fmt::{Display, Formatter};
use std::io;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// A monitor error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A monitor error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid packet: {0}")]
    PacketError(#[from] redpress_packet::error::Error),
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("duplicate host: {0}")]
    DuplicateHost(IpAddr),
    #[error("unsupported address family for host {0}")]
    UnsupportedAddress(IpAddr),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("probe failed to send: {0}")]
    ProbeFailed(IoError),
    #[error("missing address from socket call")]
    MissingAddr,
    #[error("{task} failed {failures} consecutive times: {source}")]
    Persistent {
        task: Task,
        failures: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("monitor error: {0}")]
    Other(String),
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Custom IO error.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("Failed to {1}: {0}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    /// Get the custom error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SendTo(e, _) | Self::Other(e, _) => ErrorKind::from(e),
        }
    }
}

/// Custom error kind.
///
/// This includes additional error kinds that are not part of the standard [`io::ErrorKind`].
#[derive(Debug, Eq, PartialEq)]
pub enum ErrorKind {
    HostUnreachable,
    NetUnreachable,
    Std(io::ErrorKind),
}

/// Io operation.
#[derive(Debug)]
pub enum IoOperation {
    NewSocket,
    CloneSocket,
    SetNonBlocking,
    Select,
    RecvFrom,
    SpawnThread,
    WriteReport,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::CloneSocket => write!(f, "clone socket"),
            Self::SetNonBlocking => write!(f, "set non-blocking"),
            Self::Select => write!(f, "select"),
            Self::RecvFrom => write!(f, "recv from"),
            Self::SpawnThread => write!(f, "spawn thread"),
            Self::WriteReport => write!(f, "write report"),
        }
    }
}

/// A long running task of the monitor.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Task {
    Prober,
    Listener,
    Reporter,
}

impl Display for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prober => write!(f, "prober"),
            Self::Listener => write!(f, "listener"),
            Self::Reporter => write!(f, "reporter"),
        }
    }
}
