use crate::*;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub const ARP_HARDWARE_ETHERNET: u16 = 1;
/// Ethernet/IPv4 ARP payload: 8 fixed bytes plus two MAC/IPv4 address pairs.
pub const ARP_PAYLOAD_LEN: usize = 28;

const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_OFFSET: usize = 4;
const PROTOCOL_ADDR_LEN_OFFSET: usize = 5;
const OPCODE_RANGE: (usize, usize) = (6, 8);
const SENDER_MAC_RANGE: (usize, usize) = (8, 14);
const SENDER_IP_RANGE: (usize, usize) = (14, 18);
const TARGET_MAC_RANGE: (usize, usize) = (18, 24);
const TARGET_IP_RANGE: (usize, usize) = (24, 28);

///
/// EthernetFrame wrapper for the Ethernet/IPv4 flavor of the packet
/// structure described in RFC 826. Hardware and protocol address lengths are
/// fixed at 6 and 4, so every field sits at a known offset.
///
#[derive(Clone, Debug)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    /// A link-broadcast request asking who holds `target_ip`.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> ArpFrame {
        let mut arp = ArpFrame::empty();
        arp.set_opcode(ArpOp::Request);
        arp.set_sender_mac(sender_mac);
        arp.set_sender_ip(sender_ip);
        arp.set_target_mac(MacAddr::zero());
        arp.set_target_ip(target_ip);
        arp.frame.set_dest_mac(MacAddr::broadcast());
        arp.frame.set_src_mac(sender_mac);
        arp
    }

    /// A reply asserting `sender` holds `sender_ip`, addressed to the
    /// requester both in the ARP body and on the link.
    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> ArpFrame {
        let mut arp = ArpFrame::empty();
        arp.set_opcode(ArpOp::Reply);
        arp.set_sender_mac(sender_mac);
        arp.set_sender_ip(sender_ip);
        arp.set_target_mac(target_mac);
        arp.set_target_ip(target_ip);
        arp.frame.set_dest_mac(target_mac);
        arp.frame.set_src_mac(sender_mac);
        arp
    }

    fn empty() -> ArpFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_ether_type(ARP_ETHER_TYPE);
        frame.set_payload(&[0; ARP_PAYLOAD_LEN]);

        let mut arp = ArpFrame { frame };
        let (start, end) = HARDWARE_TYPE_RANGE;
        arp.set_arp_data(&ARP_HARDWARE_ETHERNET.to_be_bytes(), start, end);
        let (start, end) = PROTOCOL_TYPE_RANGE;
        arp.set_arp_data(&IPV4_ETHER_TYPE.to_be_bytes(), start, end);
        arp.set_arp_data(&[6], HARDWARE_ADDR_LEN_OFFSET, HARDWARE_ADDR_LEN_OFFSET + 1);
        arp.set_arp_data(&[4], PROTOCOL_ADDR_LEN_OFFSET, PROTOCOL_ADDR_LEN_OFFSET + 1);
        arp
    }

    pub fn hardware_type(&self) -> u16 {
        let (start, end) = HARDWARE_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn protocol_type(&self) -> u16 {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn hardware_addr_len(&self) -> u8 {
        self.arp_data(HARDWARE_ADDR_LEN_OFFSET, HARDWARE_ADDR_LEN_OFFSET + 1)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        self.arp_data(PROTOCOL_ADDR_LEN_OFFSET, PROTOCOL_ADDR_LEN_OFFSET + 1)[0]
    }

    pub fn opcode(&self) -> u16 {
        let (start, end) = OPCODE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn set_opcode(&mut self, op: ArpOp) {
        let (start, end) = OPCODE_RANGE;
        self.set_arp_data(&(op as u16).to_be_bytes(), start, end);
    }

    pub fn sender_mac(&self) -> MacAddr {
        let (start, end) = SENDER_MAC_RANGE;
        MacAddr::new(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn set_sender_mac(&mut self, mac: MacAddr) {
        let (start, end) = SENDER_MAC_RANGE;
        self.set_arp_data(&mac.bytes, start, end);
    }

    pub fn sender_ip(&self) -> Ipv4Addr {
        let (start, end) = SENDER_IP_RANGE;
        let bytes: [u8; 4] = self.arp_data(start, end).try_into().unwrap();
        Ipv4Addr::from(bytes)
    }

    pub fn set_sender_ip(&mut self, ip: Ipv4Addr) {
        let (start, end) = SENDER_IP_RANGE;
        self.set_arp_data(&ip.octets(), start, end);
    }

    pub fn target_mac(&self) -> MacAddr {
        let (start, end) = TARGET_MAC_RANGE;
        MacAddr::new(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn set_target_mac(&mut self, mac: MacAddr) {
        let (start, end) = TARGET_MAC_RANGE;
        self.set_arp_data(&mac.bytes, start, end);
    }

    pub fn target_ip(&self) -> Ipv4Addr {
        let (start, end) = TARGET_IP_RANGE;
        let bytes: [u8; 4] = self.arp_data(start, end).try_into().unwrap();
        Ipv4Addr::from(bytes)
    }

    pub fn set_target_ip(&mut self, ip: Ipv4Addr) {
        let (start, end) = TARGET_IP_RANGE;
        self.set_arp_data(&ip.octets(), start, end);
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    // Returns the payload bytes between start and end, exclusive
    fn arp_data(&self, start: usize, end: usize) -> &[u8] {
        &self.frame.data[ETHERNET_HEADER_LEN + start..ETHERNET_HEADER_LEN + end]
    }

    fn set_arp_data(&mut self, bytes: &[u8], start: usize, end: usize) {
        self.frame.data[ETHERNET_HEADER_LEN + start..ETHERNET_HEADER_LEN + end]
            .copy_from_slice(bytes);
    }
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    ///
    /// Decorates the given EthernetFrame with ArpFrame getters/setters.
    /// Validates
    /// - The frame has an ARP ether type
    /// - The payload holds a complete Ethernet/IPv4 ARP packet
    ///
    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("Frame does not have ARP ether type");
        }
        if frame.payload().len() < ARP_PAYLOAD_LEN {
            return Err("Frame payload is too small to hold an ARP packet");
        }

        let arp = ArpFrame { frame };
        if arp.hardware_addr_len() != 6 || arp.protocol_addr_len() != 4 {
            return Err("ARP packet does not carry Ethernet/IPv4 addresses");
        }
        Ok(arp)
    }
}
