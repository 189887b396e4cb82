use crate::buffer::Buffer;
use crate::error::{Error, Result};
use std::fmt::{Debug, Formatter};

/// The type of `ICMPv4` packet.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpType {
    EchoReply,
    DestinationUnreachable,
    EchoRequest,
    TimeExceeded,
    Other(u8),
}

impl IcmpType {
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::EchoReply => 0,
            Self::DestinationUnreachable => 3,
            Self::EchoRequest => 8,
            Self::TimeExceeded => 11,
            Self::Other(id) => *id,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::EchoReply,
            3 => Self::DestinationUnreachable,
            8 => Self::EchoRequest,
            11 => Self::TimeExceeded,
            id => Self::Other(id),
        }
    }
}

/// The `ICMPv4` code.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct IcmpCode(pub u8);

impl From<u8> for IcmpCode {
    fn from(val: u8) -> Self {
        Self(val)
    }
}

const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;

/// Represents the fixed `ICMPv4` header common to every message type.
///
/// Used to inspect the type of an inbound message before choosing a more
/// specific view such as [`echo::EchoPacket`].
pub struct IcmpPacket<'a> {
    buf: Buffer<'a>,
}

impl<'a> IcmpPacket<'a> {
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Immutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("IcmpPacket"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        8
    }

    #[must_use]
    pub fn get_icmp_type(&self) -> IcmpType {
        IcmpType::from(self.buf.read_u8(TYPE_OFFSET))
    }

    #[must_use]
    pub fn get_icmp_code(&self) -> IcmpCode {
        IcmpCode::from(self.buf.read_u8(CODE_OFFSET))
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        self.buf.read_u16(CHECKSUM_OFFSET)
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

impl Debug for IcmpPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpPacket")
            .field("icmp_type", &self.get_icmp_type())
            .field("icmp_code", &self.get_icmp_code())
            .field("checksum", &self.get_checksum())
            .finish()
    }
}

/// `ICMPv4` echo request and echo reply messages.
///
/// Both messages share one wire layout and differ only in the type field:
///
/// ```text
/// 0       8       16              32
/// | type  | code  |   checksum    |
/// |  identifier   |   sequence    |
/// |  payload ...                  |
/// ```
pub mod echo {
    use super::{IcmpCode, IcmpType, CHECKSUM_OFFSET, CODE_OFFSET, TYPE_OFFSET};
    use crate::buffer::Buffer;
    use crate::error::{Error, Result};
    use crate::fmt_payload;
    use std::fmt::{Debug, Formatter};

    const IDENTIFIER_OFFSET: usize = 4;
    const SEQUENCE_OFFSET: usize = 6;

    /// Represents an `ICMPv4` echo request or echo reply packet.
    ///
    /// The internal representation is held in network byte order (big-endian)
    /// and all accessor methods take and return data in host byte order.
    pub struct EchoPacket<'a> {
        buf: Buffer<'a>,
    }

    impl<'a> EchoPacket<'a> {
        pub fn new(packet: &'a mut [u8]) -> Result<Self> {
            if packet.len() >= Self::minimum_packet_size() {
                Ok(Self {
                    buf: Buffer::Mutable(packet),
                })
            } else {
                Err(Error::InsufficientPacketBuffer(
                    String::from("EchoPacket"),
                    Self::minimum_packet_size(),
                    packet.len(),
                ))
            }
        }

        pub fn new_view(packet: &'a [u8]) -> Result<Self> {
            if packet.len() >= Self::minimum_packet_size() {
                Ok(Self {
                    buf: Buffer::Immutable(packet),
                })
            } else {
                Err(Error::InsufficientPacketBuffer(
                    String::from("EchoPacket"),
                    Self::minimum_packet_size(),
                    packet.len(),
                ))
            }
        }

        #[must_use]
        pub const fn minimum_packet_size() -> usize {
            8
        }

        #[must_use]
        pub fn get_icmp_type(&self) -> IcmpType {
            IcmpType::from(self.buf.read_u8(TYPE_OFFSET))
        }

        #[must_use]
        pub fn get_icmp_code(&self) -> IcmpCode {
            IcmpCode::from(self.buf.read_u8(CODE_OFFSET))
        }

        #[must_use]
        pub fn get_checksum(&self) -> u16 {
            self.buf.read_u16(CHECKSUM_OFFSET)
        }

        #[must_use]
        pub fn get_identifier(&self) -> u16 {
            self.buf.read_u16(IDENTIFIER_OFFSET)
        }

        #[must_use]
        pub fn get_sequence(&self) -> u16 {
            self.buf.read_u16(SEQUENCE_OFFSET)
        }

        pub fn set_icmp_type(&mut self, val: IcmpType) {
            self.buf.write_u8(TYPE_OFFSET, val.id());
        }

        pub fn set_icmp_code(&mut self, val: IcmpCode) {
            self.buf.write_u8(CODE_OFFSET, val.0);
        }

        pub fn set_checksum(&mut self, val: u16) {
            self.buf.write_u16(CHECKSUM_OFFSET, val);
        }

        pub fn set_identifier(&mut self, val: u16) {
            self.buf.write_u16(IDENTIFIER_OFFSET, val);
        }

        pub fn set_sequence(&mut self, val: u16) {
            self.buf.write_u16(SEQUENCE_OFFSET, val);
        }

        /// Copy `vals` in after the header; the buffer must have room for them.
        pub fn set_payload(&mut self, vals: &[u8]) {
            self.buf.write_slice(Self::minimum_packet_size(), vals);
        }

        #[must_use]
        pub fn packet(&self) -> &[u8] {
            self.buf.as_slice()
        }

        #[must_use]
        pub fn payload(&self) -> &[u8] {
            &self.buf.as_slice()[Self::minimum_packet_size()..]
        }
    }

    impl Debug for EchoPacket<'_> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EchoPacket")
                .field("icmp_type", &self.get_icmp_type())
                .field("icmp_code", &self.get_icmp_code())
                .field("checksum", &self.get_checksum())
                .field("identifier", &self.get_identifier())
                .field("sequence", &self.get_sequence())
                .field("payload", &fmt_payload(self.payload()))
                .finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::checksum::icmp_ipv4_checksum;
        use hex_literal::hex;

        #[test]
        fn test_build_echo_request() -> anyhow::Result<()> {
            let mut buf = [0_u8; 12];
            let mut packet = EchoPacket::new(&mut buf)?;
            packet.set_icmp_type(IcmpType::EchoRequest);
            packet.set_icmp_code(IcmpCode(0));
            packet.set_identifier(0xcafe);
            packet.set_sequence(0x0102);
            packet.set_payload(&[0xde, 0xad, 0xbe, 0xef]);
            packet.set_checksum(icmp_ipv4_checksum(packet.packet()));
            assert_eq!(&hex!("08 00 8e 61 ca fe 01 02 de ad be ef"), packet.packet());
            Ok(())
        }

        #[test]
        fn test_view_echo_reply() -> anyhow::Result<()> {
            let buf = hex!("00 00 8d 0e 04 d2 ff ff 01 02 03");
            let packet = EchoPacket::new_view(&buf)?;
            assert_eq!(IcmpType::EchoReply, packet.get_icmp_type());
            assert_eq!(IcmpCode(0), packet.get_icmp_code());
            assert_eq!(0x8d0e, packet.get_checksum());
            assert_eq!(1234, packet.get_identifier());
            assert_eq!(u16::MAX, packet.get_sequence());
            assert_eq!(&[0x01, 0x02, 0x03], packet.payload());
            Ok(())
        }

        #[test]
        fn test_empty_payload() -> anyhow::Result<()> {
            let buf = hex!("00 00 00 00 00 01 00 02");
            let packet = EchoPacket::new_view(&buf)?;
            assert!(packet.payload().is_empty());
            Ok(())
        }

        #[test]
        fn test_new_view_insufficient_buffer() {
            const SIZE: usize = EchoPacket::minimum_packet_size();
            let buf = [0_u8; SIZE - 1];
            let err = EchoPacket::new_view(&buf).unwrap_err();
            assert_eq!(
                Error::InsufficientPacketBuffer(String::from("EchoPacket"), SIZE, SIZE - 1),
                err
            );
        }

        #[test]
        fn test_debug() -> anyhow::Result<()> {
            let buf = hex!("00 00 00 00 00 01 00 02 ab");
            let packet = EchoPacket::new_view(&buf)?;
            assert_eq!(
                "EchoPacket { icmp_type: EchoReply, icmp_code: IcmpCode(0), checksum: 0, identifier: 1, sequence: 2, payload: \"ab\" }",
                format!("{packet:?}")
            );
            Ok(())
        }
    }
}
