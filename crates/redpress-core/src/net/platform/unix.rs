use crate::error::{ErrorKind, IoError, IoOperation, IoResult};
use crate::net::socket::Socket;
use nix::errno::Errno;
use nix::sys::select::{select, FdSet};
use nix::sys::time::{TimeVal, TimeValLike};
use redpress_packet::fmt_payload;
use socket2::{Domain, Protocol, SockAddr, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::instrument;

/// An `ICMPv4` socket backed by `socket2`.
pub struct SocketImpl(socket2::Socket);

/// Tag an `io::Error` with the operation which produced it.
fn failed(op: IoOperation) -> impl FnOnce(io::Error) -> IoError {
    move |err| IoError::Other(err, op)
}

impl Socket for SocketImpl {
    #[instrument(level = "trace")]
    fn new_icmp_socket_ipv4(raw: bool) -> IoResult<Self> {
        let ty = if raw { Type::RAW } else { Type::DGRAM };
        let socket = socket2::Socket::new(Domain::IPV4, ty, Some(Protocol::ICMPV4))
            .map_err(failed(IoOperation::NewSocket))?;
        socket
            .set_nonblocking(true)
            .map_err(failed(IoOperation::SetNonBlocking))?;
        Ok(Self(socket))
    }

    #[instrument(skip(self), level = "trace")]
    fn try_clone(&self) -> IoResult<Self> {
        self.0
            .try_clone()
            .map(Self)
            .map_err(failed(IoOperation::CloneSocket))
    }

    #[instrument(skip(self, buf), level = "trace")]
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
        tracing::trace!(buf = fmt_payload(buf), %addr, "send");
        self.0
            .send_to(buf, &SockAddr::from(addr))
            .map(drop)
            .map_err(|err| IoError::SendTo(err, addr))
    }

    #[instrument(skip(self), level = "trace")]
    fn is_readable(&mut self, timeout: Duration) -> IoResult<bool> {
        let mut readers = FdSet::new();
        readers.insert(self.0.as_fd());
        let mut timeout =
            TimeVal::milliseconds(i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX));
        match select(None, &mut readers, None, None, &mut timeout) {
            Ok(ready) => Ok(ready > 0),
            Err(Errno::EINTR) => Ok(false),
            Err(errno) => Err(IoError::Other(io::Error::from(errno), IoOperation::Select)),
        }
    }

    #[instrument(skip(self, buf), level = "trace")]
    fn recv_from(&mut self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
        let (len, addr) = recv_into(&self.0, buf).map_err(failed(IoOperation::RecvFrom))?;
        tracing::trace!(buf = fmt_payload(&buf[..len]), len, ?addr, "recv");
        Ok((len, addr))
    }
}

/// Receive into an initialised buffer.
///
/// `socket2::Socket::recv_from` only accepts a `MaybeUninit` buffer.
#[expect(unsafe_code)]
fn recv_into(socket: &socket2::Socket, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)> {
    // SAFETY: `recv_from` never writes uninitialised bytes into the buffer.
    let uninit = unsafe { &mut *(std::ptr::from_mut::<[u8]>(buf) as *mut [MaybeUninit<u8>]) };
    let (len, addr) = socket.recv_from(uninit)?;
    Ok((len, addr.as_socket()))
}

impl From<&io::Error> for ErrorKind {
    fn from(value: &io::Error) -> Self {
        match value.raw_os_error().map(Errno::from_raw) {
            Some(Errno::EHOSTUNREACH) => Self::HostUnreachable,
            Some(Errno::ENETUNREACH) => Self::NetUnreachable,
            _ => Self::Std(value.kind()),
        }
    }
}

#[cfg(test)]
impl From<ErrorKind> for io::Error {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::HostUnreachable => Self::from(Errno::EHOSTUNREACH),
            ErrorKind::NetUnreachable => Self::from(Errno::ENETUNREACH),
            ErrorKind::Std(kind) => Self::from(kind),
        }
    }
}
