use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::{fmt_payload, IpProtocol};
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

const VERSION_OFFSET: usize = 0;
const IHL_OFFSET: usize = 0;
const TOTAL_LENGTH_OFFSET: usize = 2;
const TIME_TO_LIVE_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

/// A read-only view of an `IPv4` packet as delivered by a raw socket.
///
/// Only the fields needed to locate and attribute the carried `ICMPv4`
/// message are exposed.
pub struct Ipv4Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv4Packet<'a> {
    /// Create a view, validating that the declared header fits the buffer.
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() < Self::minimum_packet_size() {
            return Err(Error::InsufficientPacketBuffer(
                String::from("Ipv4Packet"),
                Self::minimum_packet_size(),
                packet.len(),
            ));
        }
        let ipv4 = Self {
            buf: Buffer::Immutable(packet),
        };
        let header_len = ipv4.header_length_bytes();
        if header_len < Self::minimum_packet_size() || header_len > packet.len() {
            return Err(Error::InvalidHeaderLength(header_len, packet.len()));
        }
        Ok(ipv4)
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        20
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        (self.buf.read_u8(VERSION_OFFSET) & 0xf0) >> 4
    }

    /// The header length in 32-bit words.
    #[must_use]
    pub fn get_header_length(&self) -> u8 {
        self.buf.read_u8(IHL_OFFSET) & 0xf
    }

    #[must_use]
    pub fn get_total_length(&self) -> u16 {
        self.buf.read_u16(TOTAL_LENGTH_OFFSET)
    }

    #[must_use]
    pub fn get_ttl(&self) -> u8 {
        self.buf.read_u8(TIME_TO_LIVE_OFFSET)
    }

    #[must_use]
    pub fn get_protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buf.read_u8(PROTOCOL_OFFSET))
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.read_array::<4>(SOURCE_OFFSET))
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.read_array::<4>(DESTINATION_OFFSET))
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The bytes following the header, including any options.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[self.header_length_bytes()..]
    }

    fn header_length_bytes(&self) -> usize {
        usize::from(self.get_header_length()) * 4
    }
}

impl Debug for Ipv4Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv4Packet")
            .field("version", &self.get_version())
            .field("header_length", &self.get_header_length())
            .field("total_length", &self.get_total_length())
            .field("ttl", &self.get_ttl())
            .field("protocol", &self.get_protocol())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}
