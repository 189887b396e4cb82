use crate::error::{Error, ErrorKind};

/// Utility methods to map errors.
pub struct ErrorMapper;

impl ErrorMapper {
    /// Convert a given [`ErrorKind`] to [`Error::ProbeFailed`].
    #[expect(clippy::needless_pass_by_value)]
    pub fn probe_failed(err: Error, kind: ErrorKind) -> Error {
        match err {
            Error::IoError(io_err) if io_err.kind() == kind => Error::ProbeFailed(io_err),
            _ => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;
    use std::io;
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    const ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));

    #[test]
    fn test_probe_failed() {
        let io_err = io::Error::from(ErrorKind::HostUnreachable);
        let err = Error::IoError(IoError::SendTo(io_err, ADDR));
        let probe_err = ErrorMapper::probe_failed(err, ErrorKind::HostUnreachable);
        assert!(matches!(probe_err, Error::ProbeFailed(_)));
    }

    #[test]
    fn test_other_kind_unchanged() {
        let io_err = io::Error::from(ErrorKind::Std(io::ErrorKind::PermissionDenied));
        let err = Error::IoError(IoError::SendTo(io_err, ADDR));
        let probe_err = ErrorMapper::probe_failed(err, ErrorKind::HostUnreachable);
        assert!(matches!(probe_err, Error::IoError(_)));
    }

    #[test]
    fn test_non_io_unchanged() {
        let probe_err = ErrorMapper::probe_failed(Error::MissingAddr, ErrorKind::NetUnreachable);
        assert!(matches!(probe_err, Error::MissingAddr));
    }
}
