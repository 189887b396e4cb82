use crate::constants::{MAX_PACKET_SIZE, PAYLOAD_SIZE};
use crate::error::{Error, ErrorKind, Result};
use crate::net::common::ErrorMapper;
use crate::net::socket::Socket;
use crate::probe::{EchoReply, Probe};
use crate::types::{Identifier, Sequence};
use redpress_packet::checksum::icmp_ipv4_checksum;
use redpress_packet::icmpv4::echo::EchoPacket;
use redpress_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
use redpress_packet::ipv4::Ipv4Packet;
use redpress_packet::IpProtocol;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::SystemTime;
use tracing::instrument;

/// The size of every echo request we send.
const ECHO_REQUEST_SIZE: usize = EchoPacket::minimum_packet_size() + PAYLOAD_SIZE;

/// Build and send an echo request for `probe`.
///
/// The kernel supplies the IP header for both raw and datagram sockets.
#[instrument(skip(socket), level = "trace")]
pub fn dispatch_echo_request<S: Socket>(socket: &mut S, probe: Probe) -> Result<()> {
    if !probe.addr.is_ipv4() {
        return Err(Error::UnsupportedAddress(probe.addr));
    }
    let mut icmp_buf = [0_u8; ECHO_REQUEST_SIZE];
    let echo_request = make_echo_request(&mut icmp_buf, &probe)?;
    let remote_addr = SocketAddr::new(probe.addr, 0);
    socket
        .send_to(echo_request.packet(), remote_addr)
        .map_err(Error::IoError)
        .map_err(|err| ErrorMapper::probe_failed(err, ErrorKind::HostUnreachable))
        .map_err(|err| ErrorMapper::probe_failed(err, ErrorKind::NetUnreachable))?;
    Ok(())
}

/// Read the next packet from `socket` and extract an echo reply, if any.
///
/// When `ip_header` is set the read includes the IPv4 header, as it does for
/// raw sockets, and the source address is taken from it.
#[instrument(skip(socket), level = "trace")]
pub fn recv_echo_reply<S: Socket>(socket: &mut S, ip_header: bool) -> Result<Option<EchoReply>> {
    let mut buf = [0_u8; MAX_PACKET_SIZE];
    match socket.recv_from(&mut buf) {
        Ok((bytes_read, addr)) => {
            let received = SystemTime::now();
            extract_echo_reply(&buf[..bytes_read], addr, ip_header, received)
        }
        Err(err) => match err.kind() {
            ErrorKind::Std(io::ErrorKind::WouldBlock) => Ok(None),
            _ => Err(Error::IoError(err)),
        },
    }
}

fn make_echo_request<'a>(icmp_buf: &'a mut [u8], probe: &Probe) -> Result<EchoPacket<'a>> {
    let mut icmp = EchoPacket::new(icmp_buf)?;
    icmp.set_icmp_type(IcmpType::EchoRequest);
    icmp.set_icmp_code(IcmpCode(0));
    icmp.set_identifier(probe.identifier.0);
    icmp.set_sequence(probe.sequence.0);
    icmp.set_payload(probe.payload.as_bytes());
    icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
    Ok(icmp)
}

fn extract_echo_reply(
    buf: &[u8],
    addr: Option<SocketAddr>,
    ip_header: bool,
    received: SystemTime,
) -> Result<Option<EchoReply>> {
    if ip_header {
        let ipv4 = Ipv4Packet::new_view(buf)?;
        if ipv4.get_protocol() != IpProtocol::Icmp {
            return Ok(None);
        }
        extract_echo(ipv4.payload(), IpAddr::V4(ipv4.get_source()), received)
    } else {
        let src = addr.ok_or(Error::MissingAddr)?.ip();
        extract_echo(buf, src, received)
    }
}

fn extract_echo(icmp: &[u8], src: IpAddr, received: SystemTime) -> Result<Option<EchoReply>> {
    let icmp_type = IcmpPacket::new_view(icmp)?.get_icmp_type();
    if icmp_type != IcmpType::EchoReply {
        tracing::trace!(?icmp_type, %src, "ignoring icmp message");
        return Ok(None);
    }
    let echo = EchoPacket::new_view(icmp)?;
    Ok(Some(EchoReply::new(
        src,
        Identifier(echo.get_identifier()),
        Sequence(echo.get_sequence()),
        echo.payload().to_vec(),
        received,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoResult};
    use crate::mocket_recv_from;
    use crate::net::socket::MockSocket;
    use crate::types::IdentityPayload;
    use mockall::predicate;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    const PAYLOAD: [u8; PAYLOAD_SIZE] =
        hex_literal::hex!("00 11 22 33 44 55 66 77 88 99 aa bb cc dd ee ff");

    fn make_probe(addr: IpAddr) -> Probe {
        Probe::new(
            addr,
            Identifier(0xcafe),
            Sequence(7),
            IdentityPayload::new(PAYLOAD),
        )
    }

    #[test]
    fn test_dispatch_echo_request() -> anyhow::Result<()> {
        let dest_addr = IpAddr::from_str("5.6.7.8")?;
        let expected_send_to_buf = hex_literal::hex!(
            "
            08 00 70 b6 ca fe 00 07 00 11 22 33 44 55 66 77
            88 99 aa bb cc dd ee ff
            "
        );
        let expected_send_to_addr = SocketAddr::new(dest_addr, 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .with(
                predicate::eq(expected_send_to_buf),
                predicate::eq(expected_send_to_addr),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        dispatch_echo_request(&mut mocket, make_probe(dest_addr))?;
        Ok(())
    }

    #[test]
    fn test_dispatch_echo_request_host_unreachable() -> anyhow::Result<()> {
        let dest_addr = IpAddr::from_str("5.6.7.8")?;
        let mut mocket = MockSocket::new();
        mocket.expect_send_to().times(1).returning(|_, addr| {
            Err(IoError::SendTo(
                io::Error::from(ErrorKind::HostUnreachable),
                addr,
            ))
        });
        let err = dispatch_echo_request(&mut mocket, make_probe(dest_addr)).unwrap_err();
        assert!(matches!(err, Error::ProbeFailed(_)));
        Ok(())
    }

    #[test]
    fn test_dispatch_echo_request_other_error() -> anyhow::Result<()> {
        let dest_addr = IpAddr::from_str("5.6.7.8")?;
        let mut mocket = MockSocket::new();
        mocket.expect_send_to().times(1).returning(|_, addr| {
            Err(IoError::SendTo(
                io::Error::from(io::ErrorKind::PermissionDenied),
                addr,
            ))
        });
        let err = dispatch_echo_request(&mut mocket, make_probe(dest_addr)).unwrap_err();
        assert!(matches!(err, Error::IoError(IoError::SendTo(_, _))));
        Ok(())
    }

    #[test]
    fn test_dispatch_ipv6_rejected() -> anyhow::Result<()> {
        let dest_addr = IpAddr::from_str("2001:db8::1")?;
        let mut mocket = MockSocket::new();
        mocket.expect_send_to().never();
        let err = dispatch_echo_request(&mut mocket, make_probe(dest_addr)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAddress(_)));
        Ok(())
    }

    #[test]
    fn test_recv_echo_reply_with_ip_header() -> anyhow::Result<()> {
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 2c 00 00 00 00 37 01 00 00 01 01 01 01
            c0 a8 01 15 00 00 dc 38 ca fe 00 07 00 11 22 33
            44 55 66 77 88 99 aa bb cc dd ee ff
            "
        );
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_from()
            .times(1)
            .returning(mocket_recv_from!(expected_read_buf, from));
        let reply = recv_echo_reply(&mut mocket, true)?.unwrap();
        assert_eq!(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), reply.addr);
        assert_eq!(Identifier(0xcafe), reply.identifier);
        assert_eq!(Sequence(7), reply.sequence);
        assert_eq!(PAYLOAD.to_vec(), reply.payload);
        Ok(())
    }

    #[test]
    fn test_recv_echo_reply_datagram() -> anyhow::Result<()> {
        let expected_read_buf = hex_literal::hex!(
            "
            00 00 ff d0 00 2a ff ff 00 11 22 33 44 55 66 77
            88 99 aa bb cc dd ee ff
            "
        );
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)), 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_from()
            .times(1)
            .returning(mocket_recv_from!(expected_read_buf, from));
        let reply = recv_echo_reply(&mut mocket, false)?.unwrap();
        assert_eq!(IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)), reply.addr);
        assert_eq!(Identifier(42), reply.identifier);
        assert_eq!(Sequence(u16::MAX), reply.sequence);
        assert_eq!(PAYLOAD.to_vec(), reply.payload);
        Ok(())
    }

    #[test]
    fn test_recv_ignores_other_icmp_types() -> anyhow::Result<()> {
        let expected_read_buf = hex_literal::hex!("08 00 00 00 00 2a 00 01");
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)), 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_from()
            .times(1)
            .returning(mocket_recv_from!(expected_read_buf, from));
        assert_eq!(None, recv_echo_reply(&mut mocket, false)?);
        Ok(())
    }

    #[test]
    fn test_recv_ignores_non_icmp_protocol() -> anyhow::Result<()> {
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 1c 00 00 00 00 40 11 00 00 01 01 01 01
            c0 a8 01 15 00 00 00 00 00 00 00 00
            "
        );
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_from()
            .times(1)
            .returning(mocket_recv_from!(expected_read_buf, from));
        assert_eq!(None, recv_echo_reply(&mut mocket, true)?);
        Ok(())
    }

    #[test]
    fn test_recv_truncated_is_packet_error() {
        let expected_read_buf = hex_literal::hex!("00 00 ff d0 00 2a");
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)), 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_from()
            .times(1)
            .returning(mocket_recv_from!(expected_read_buf, from));
        let err = recv_echo_reply(&mut mocket, false).unwrap_err();
        assert!(matches!(err, Error::PacketError(_)));
    }

    #[test]
    fn test_recv_would_block() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket.expect_recv_from().times(1).returning(|_| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::WouldBlock),
                crate::error::IoOperation::RecvFrom,
            ))
        });
        assert_eq!(None, recv_echo_reply(&mut mocket, true)?);
        Ok(())
    }

    #[test]
    fn test_recv_error() {
        let mut mocket = MockSocket::new();
        mocket.expect_recv_from().times(1).returning(|_| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::ConnectionReset),
                crate::error::IoOperation::RecvFrom,
            ))
        });
        let err = recv_echo_reply(&mut mocket, true).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_recv_missing_addr() {
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_from()
            .times(1)
            .returning(|buf: &mut [u8]| -> IoResult<(usize, Option<SocketAddr>)> {
                buf[..8].copy_from_slice(&[0, 0, 0, 0, 0, 1, 0, 1]);
                Ok((8, None))
            });
        let err = recv_echo_reply(&mut mocket, false).unwrap_err();
        assert!(matches!(err, Error::MissingAddr));
    }
}
