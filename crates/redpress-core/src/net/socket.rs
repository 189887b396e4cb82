use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

/// An `ICMPv4` socket.
#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Create a non-blocking IPv4 socket for `ICMP`, raw if `raw` is set and
    /// an `IPPROTO_ICMP` datagram socket otherwise.
    fn new_icmp_socket_ipv4(raw: bool) -> Result<Self>;
    /// Create a second handle to the same underlying socket.
    fn try_clone(&self) -> Result<Self>;
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Returns true if the socket becomes readable before the timeout, false otherwise.
    fn is_readable(&mut self, timeout: Duration) -> Result<bool>;
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>)>;
}
