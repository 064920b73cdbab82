use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

pub const IPV4_HEADER_LEN: usize = 20;

/// Minimal IPv4 packet wrapper. `layer3_offset` points at the first header
/// byte inside `data` (14 when the packet still sits inside an Ethernet
/// frame, 0 when freestanding); `payload_offset` accounts for the IHL field.
#[derive(Clone, Debug)]
pub struct Ipv4Packet {
    pub data: PacketData,
    pub layer3_offset: usize,
    pub payload_offset: usize,
}

impl Ipv4Packet {
    pub fn from_buffer(
        data: PacketData,
        layer3_offset: usize,
    ) -> Result<Ipv4Packet, &'static str> {
        if data.len() < layer3_offset + IPV4_HEADER_LEN {
            return Err("Data is too short to be an IPv4 packet");
        }

        let version: u8 = (data[layer3_offset] & 0xF0) >> 4;
        if version != 4 {
            return Err("Packet has incorrect version, is not an IPv4 packet");
        }

        // This is the header length in 32bit words
        let ihl = (data[layer3_offset] & 0x0F) as usize;
        if ihl < 5 {
            return Err("Packet header length field is below the minimum of 5 words");
        }

        // Frames straight off the wire may carry link-layer padding, so the
        // buffer is allowed to run past total_len but never short of it.
        let total_len = u16::from_be_bytes(
            data[layer3_offset + 2..=layer3_offset + 3]
                .try_into()
                .unwrap(),
        ) as usize;
        if total_len < ihl * 4 || data.len() < layer3_offset + total_len {
            return Err("Packet has invalid total length field");
        }

        Ok(Ipv4Packet {
            data,
            layer3_offset,
            payload_offset: layer3_offset + (ihl * 4),
        })
    }

    /// All-zero minimal packet: version 4, five-word header, total length 20.
    pub fn empty() -> Ipv4Packet {
        let mut data = vec![0; IPV4_HEADER_LEN];
        data[0] = 0x45;
        data[3] = IPV4_HEADER_LEN as u8;
        Ipv4Packet {
            data,
            layer3_offset: 0,
            payload_offset: IPV4_HEADER_LEN,
        }
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        let bytes: [u8; 4] = self.data[self.layer3_offset + 12..self.layer3_offset + 16]
            .try_into()
            .unwrap();
        Ipv4Addr::from(bytes)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 12..self.layer3_offset + 16].copy_from_slice(&addr.octets());
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        let bytes: [u8; 4] = self.data[self.layer3_offset + 16..self.layer3_offset + 20]
            .try_into()
            .unwrap();
        Ipv4Addr::from(bytes)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 16..self.layer3_offset + 20].copy_from_slice(&addr.octets());
    }

    pub fn ihl(&self) -> u8 {
        self.data[self.layer3_offset] & 0x0F
    }

    pub fn tos(&self) -> u8 {
        self.data[self.layer3_offset + 1]
    }

    pub fn total_len(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 2..=self.layer3_offset + 3]
                .try_into()
                .unwrap(),
        )
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 4..=self.layer3_offset + 5]
                .try_into()
                .unwrap(),
        )
    }

    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([
            self.data[self.layer3_offset + 6] & 0x1F,
            self.data[self.layer3_offset + 7],
        ])
    }

    pub fn ttl(&self) -> u8 {
        self.data[self.layer3_offset + 8]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.data[self.layer3_offset + 8] = ttl;
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.data[self.layer3_offset + 9])
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.data[self.layer3_offset + 9] = protocol.into();
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 10..=self.layer3_offset + 11]
                .try_into()
                .unwrap(),
        )
    }

    /// The bytes the total-length field covers past the header. Link padding
    /// beyond total_len is not payload.
    pub fn payload(&self) -> Cow<[u8]> {
        let end = self.layer3_offset + self.total_len() as usize;
        Cow::from(&self.data[self.payload_offset..end])
    }

    /// Replaces the payload and rewrites the total-length field to match.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend_from_slice(payload);

        let total_len = (self.payload_offset - self.layer3_offset + payload.len()) as u16;
        self.data[self.layer3_offset + 2..=self.layer3_offset + 3]
            .copy_from_slice(&total_len.to_be_bytes());
    }

    /// A valid header sums to 0xFFFF with the checksum field included, which
    /// makes the complemented fold come out zero.
    pub fn validate_checksum(&self) -> bool {
        internet_checksum(&self.data[self.layer3_offset..self.payload_offset]) == 0
    }

    /// Calculates what the checksum field should hold given the current
    /// header, with the field itself counted as zero.
    pub fn calculate_checksum(&self) -> u16 {
        let mut header = self.data[self.layer3_offset..self.payload_offset].to_vec();
        header[10] = 0;
        header[11] = 0;
        internet_checksum(&header)
    }

    /// Sets the checksum field to its valid value.
    pub fn set_checksum(&mut self) {
        let checksum = self.calculate_checksum();
        self.data[self.layer3_offset + 10..=self.layer3_offset + 11]
            .copy_from_slice(&checksum.to_be_bytes());
    }
}

/// Ipv4Packets are considered the same if they match from the start of the
/// IP header onward, whatever came before it.
impl PartialEq for Ipv4Packet {
    fn eq(&self, other: &Self) -> bool {
        self.data[self.layer3_offset..] == other.data[other.layer3_offset..]
    }
}

impl Eq for Ipv4Packet {}

impl TryFrom<EthernetFrame> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        Ipv4Packet::from_buffer(frame.data, ETHERNET_HEADER_LEN)
    }
}
