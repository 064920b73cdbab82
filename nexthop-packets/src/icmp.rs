use crate::*;
use std::convert::{TryFrom, TryInto};

/// Fixed part of every ICMP message: type, code, checksum, and four
/// type-specific bytes (identifier/sequence for echo, unused for errors).
pub const ICMP_HEADER_LEN: usize = 8;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_TIME_EXCEEDED: u8 = 11;

const MSG_TYPE_OFFSET: usize = 0;
const MSG_CODE_OFFSET: usize = 1;
const CHECKSUM_RANGE: (usize, usize) = (2, 4);
const IDENTIFIER_RANGE: (usize, usize) = (4, 6);
const SEQUENCE_RANGE: (usize, usize) = (6, 8);

///
/// Ipv4Packet wrapper with getters/setters for the message structure of
/// RFC 792. The checksum covers the whole ICMP message, header and body.
///
#[derive(Clone, Debug)]
pub struct IcmpMessage {
    packet: Ipv4Packet,
}

impl IcmpMessage {
    /// An empty message of the given type and code inside a minimal,
    /// otherwise-zeroed IPv4 packet.
    pub fn new(msg_type: u8, msg_code: u8) -> IcmpMessage {
        let mut packet = Ipv4Packet::empty();
        packet.set_protocol(IpProtocol::ICMP);
        packet.set_payload(&[0; ICMP_HEADER_LEN]);

        let mut message = IcmpMessage { packet };
        message.set_icmp_data(&[msg_type], MSG_TYPE_OFFSET, MSG_TYPE_OFFSET + 1);
        message.set_icmp_data(&[msg_code], MSG_CODE_OFFSET, MSG_CODE_OFFSET + 1);
        message
    }

    pub fn msg_type(&self) -> u8 {
        self.icmp_data(MSG_TYPE_OFFSET, MSG_TYPE_OFFSET + 1)[0]
    }

    pub fn msg_code(&self) -> u8 {
        self.icmp_data(MSG_CODE_OFFSET, MSG_CODE_OFFSET + 1)[0]
    }

    pub fn checksum(&self) -> u16 {
        let (start, end) = CHECKSUM_RANGE;
        u16::from_be_bytes(self.icmp_data(start, end).try_into().unwrap())
    }

    pub fn identifier(&self) -> u16 {
        let (start, end) = IDENTIFIER_RANGE;
        u16::from_be_bytes(self.icmp_data(start, end).try_into().unwrap())
    }

    pub fn set_identifier(&mut self, identifier: u16) {
        let (start, end) = IDENTIFIER_RANGE;
        self.set_icmp_data(&identifier.to_be_bytes(), start, end);
    }

    pub fn sequence(&self) -> u16 {
        let (start, end) = SEQUENCE_RANGE;
        u16::from_be_bytes(self.icmp_data(start, end).try_into().unwrap())
    }

    pub fn set_sequence(&mut self, sequence: u16) {
        let (start, end) = SEQUENCE_RANGE;
        self.set_icmp_data(&sequence.to_be_bytes(), start, end);
    }

    /// Everything after the fixed 8-byte header.
    pub fn body(&self) -> Vec<u8> {
        self.packet.payload()[ICMP_HEADER_LEN..].to_vec()
    }

    pub fn set_body(&mut self, body: &[u8]) {
        let mut payload = self.packet.payload().into_owned();
        payload.truncate(ICMP_HEADER_LEN);
        payload.extend_from_slice(body);
        self.packet.set_payload(&payload);
    }

    pub fn validate_checksum(&self) -> bool {
        internet_checksum(&self.packet.payload()) == 0
    }

    pub fn calculate_checksum(&self) -> u16 {
        let mut message = self.packet.payload().into_owned();
        message[CHECKSUM_RANGE.0] = 0;
        message[CHECKSUM_RANGE.0 + 1] = 0;
        internet_checksum(&message)
    }

    pub fn set_checksum(&mut self) {
        let checksum = self.calculate_checksum();
        let (start, end) = CHECKSUM_RANGE;
        self.set_icmp_data(&checksum.to_be_bytes(), start, end);
    }

    pub fn ipv4(&self) -> &Ipv4Packet {
        &self.packet
    }

    // Move ownership of the enclosing packet back to the caller
    pub fn packet(self) -> Ipv4Packet {
        self.packet
    }

    // Returns the message bytes between start and end, exclusive
    fn icmp_data(&self, start: usize, end: usize) -> &[u8] {
        let offset = self.packet.payload_offset;
        &self.packet.data[offset + start..offset + end]
    }

    fn set_icmp_data(&mut self, bytes: &[u8], start: usize, end: usize) {
        let offset = self.packet.payload_offset;
        self.packet.data[offset + start..offset + end].copy_from_slice(bytes);
    }
}

impl TryFrom<Ipv4Packet> for IcmpMessage {
    type Error = &'static str;

    ///
    /// Decorates the given Ipv4Packet with IcmpMessage getters/setters.
    /// Validates
    /// - The packet's protocol field says ICMP
    /// - The payload holds at least the fixed 8-byte header
    ///
    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        if packet.protocol() != IpProtocol::ICMP {
            return Err("Packet does not carry the ICMP protocol");
        }
        if packet.payload().len() < ICMP_HEADER_LEN {
            return Err("Packet payload is too small to hold an ICMP message");
        }
        Ok(IcmpMessage { packet })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_empty_message() {
        let message = IcmpMessage::new(ICMP_TIME_EXCEEDED, 0);
        assert_eq!(message.msg_type(), ICMP_TIME_EXCEEDED);
        assert_eq!(message.msg_code(), 0);
        assert_eq!(message.checksum(), 0);
        assert_eq!(message.identifier(), 0);
        assert_eq!(message.sequence(), 0);
        assert_eq!(message.body().len(), 0);
        assert_eq!(message.ipv4().protocol(), IpProtocol::ICMP);
        assert_eq!(message.ipv4().total_len(), 28);
    }

    #[test]
    fn echo_fields() {
        let mut message = IcmpMessage::new(ICMP_ECHO_REQUEST, 0);
        message.set_identifier(0x1234);
        message.set_sequence(0x0001);
        assert_eq!(message.identifier(), 0x1234);
        assert_eq!(message.sequence(), 0x0001);
    }

    #[test]
    fn checksum_covers_body() {
        let mut message = IcmpMessage::new(ICMP_ECHO_REQUEST, 0);
        message.set_identifier(0xbeef);
        message.set_body(&[1, 2, 3, 4, 5]);
        assert!(!message.validate_checksum());
        message.set_checksum();
        assert!(message.validate_checksum());

        // Corrupting the body must break the checksum
        let mut corrupted = message.clone();
        let mut body = corrupted.body();
        body[0] ^= 0xff;
        corrupted.set_body(&body);
        assert!(!corrupted.validate_checksum());
    }

    #[test]
    fn set_body_updates_total_len() {
        let mut message = IcmpMessage::new(ICMP_DEST_UNREACHABLE, 1);
        message.set_body(&[0; 28]);
        assert_eq!(message.ipv4().total_len(), 20 + 8 + 28);
        assert_eq!(message.body().len(), 28);
    }

    #[test]
    fn rejects_non_icmp_packet() {
        let mut packet = Ipv4Packet::empty();
        packet.set_protocol(IpProtocol::UDP);
        packet.set_payload(&[0; ICMP_HEADER_LEN]);
        assert!(IcmpMessage::try_from(packet).is_err());
    }

    #[test]
    fn rejects_short_message() {
        let mut packet = Ipv4Packet::empty();
        packet.set_protocol(IpProtocol::ICMP);
        packet.set_payload(&[0; 4]);
        assert!(IcmpMessage::try_from(packet).is_err());
    }
}
