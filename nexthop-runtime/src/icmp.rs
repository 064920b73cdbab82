use crate::interface::Interface;
use nexthop_packets::{
    EthernetFrame, IcmpMessage, IpProtocol, Ipv4Packet, MacAddr, ICMP_DEST_UNREACHABLE,
    ICMP_ECHO_REPLY, ICMP_TIME_EXCEEDED,
};
use std::cmp;
use std::convert::TryFrom;

/// TTL for everything this router originates.
const REPLY_TTL: u8 = 64;
/// ICMP errors quote the offending IP header plus this much of its payload.
const ERROR_QUOTED_PAYLOAD_LEN: usize = 8;

pub const NET_UNREACHABLE: u8 = 0;
pub const HOST_UNREACHABLE: u8 = 1;
pub const PORT_UNREACHABLE: u8 = 3;

/// Answers an echo request addressed to the router: identifier, sequence and
/// body come back verbatim, the IP endpoints swap, and the frame goes back
/// to the requester's MAC through `iface`.
pub fn echo_reply(request: &IcmpMessage, iface: &Interface, requester_mac: MacAddr) -> EthernetFrame {
    let mut reply = IcmpMessage::new(ICMP_ECHO_REPLY, 0);
    reply.set_identifier(request.identifier());
    reply.set_sequence(request.sequence());
    reply.set_body(&request.body());
    reply.set_checksum();

    let mut packet = reply.packet();
    packet.set_src_addr(iface.ip);
    packet.set_dest_addr(request.ipv4().src_addr());
    packet.set_ttl(REPLY_TTL);
    packet.set_checksum();
    finish_frame(&packet, iface, requester_mac)
}

/// Time Exceeded (type 11, code 0) for a datagram that ran out of TTL here.
pub fn time_exceeded(offending: &Ipv4Packet, iface: &Interface, dest_mac: MacAddr) -> EthernetFrame {
    error_message(ICMP_TIME_EXCEEDED, 0, offending, iface, dest_mac)
}

/// Destination Unreachable (type 3) with the given code; see the
/// `*_UNREACHABLE` constants for the codes the dispatcher uses.
pub fn destination_unreachable(
    code: u8,
    offending: &Ipv4Packet,
    iface: &Interface,
    dest_mac: MacAddr,
) -> EthernetFrame {
    error_message(ICMP_DEST_UNREACHABLE, code, offending, iface, dest_mac)
}

/// Whether an error about `offending` should be generated at all. Only first
/// fragments qualify, and errors are never answered with further errors.
pub fn should_reply_with_error(offending: &Ipv4Packet) -> bool {
    if offending.fragment_offset() != 0 {
        return false;
    }
    if offending.protocol() == IpProtocol::ICMP {
        if let Ok(message) = IcmpMessage::try_from(offending.clone()) {
            if is_error_type(message.msg_type()) {
                return false;
            }
        } else {
            return false;
        }
    }
    true
}

fn is_error_type(msg_type: u8) -> bool {
    // Destination Unreachable, Redirect, Time Exceeded, Parameter Problem
    [3, 5, 11, 12].contains(&msg_type)
}

// Every error carries the offending header plus its first payload bytes, per
// the ICMP error convention.
fn error_message(
    msg_type: u8,
    msg_code: u8,
    offending: &Ipv4Packet,
    iface: &Interface,
    dest_mac: MacAddr,
) -> EthernetFrame {
    let payload = offending.payload();
    let quoted = cmp::min(ERROR_QUOTED_PAYLOAD_LEN, payload.len());
    let mut body =
        offending.data[offending.layer3_offset..offending.payload_offset].to_vec();
    body.extend_from_slice(&payload[..quoted]);

    let mut message = IcmpMessage::new(msg_type, msg_code);
    message.set_body(&body);
    message.set_checksum();

    let mut packet = message.packet();
    packet.set_src_addr(iface.ip);
    packet.set_dest_addr(offending.src_addr());
    packet.set_ttl(REPLY_TTL);
    packet.set_checksum();
    finish_frame(&packet, iface, dest_mac)
}

fn finish_frame(packet: &Ipv4Packet, iface: &Interface, dest_mac: MacAddr) -> EthernetFrame {
    let mut frame = EthernetFrame::encap_ipv4(packet);
    frame.set_dest_mac(dest_mac);
    frame.set_src_mac(iface.mac);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexthop_packets::{IPV4_ETHER_TYPE, ICMP_ECHO_REQUEST};
    use std::net::Ipv4Addr;

    fn iface() -> Interface {
        Interface::new(
            "eth1",
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(10, 0, 1, 1),
        )
    }

    fn offending_udp_packet() -> Ipv4Packet {
        let mut packet = Ipv4Packet::empty();
        packet.set_protocol(IpProtocol::UDP);
        packet.set_payload(&[0xab; 32]);
        packet.set_src_addr(Ipv4Addr::new(10, 0, 1, 5));
        packet.set_dest_addr(Ipv4Addr::new(10, 0, 2, 9));
        packet.set_ttl(1);
        packet.set_checksum();
        packet
    }

    #[test]
    fn echo_reply_mirrors_request() {
        let mut request = IcmpMessage::new(ICMP_ECHO_REQUEST, 0);
        request.set_identifier(0x1234);
        request.set_sequence(0x0001);
        request.set_body(b"payload bytes");
        request.set_checksum();
        let mut packet = request.packet();
        packet.set_src_addr(Ipv4Addr::new(10, 0, 1, 5));
        packet.set_dest_addr(Ipv4Addr::new(10, 0, 1, 1));
        packet.set_checksum();
        let request = IcmpMessage::try_from(packet).unwrap();

        let requester_mac = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let frame = echo_reply(&request, &iface(), requester_mac);
        assert_eq!(frame.dest_mac(), requester_mac);
        assert_eq!(frame.src_mac(), iface().mac);
        assert_eq!(frame.ether_type(), IPV4_ETHER_TYPE);

        let packet = Ipv4Packet::try_from(frame).unwrap();
        assert!(packet.validate_checksum());
        assert_eq!(packet.src_addr(), Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(packet.dest_addr(), Ipv4Addr::new(10, 0, 1, 5));

        let reply = IcmpMessage::try_from(packet).unwrap();
        assert!(reply.validate_checksum());
        assert_eq!(reply.msg_type(), ICMP_ECHO_REPLY);
        assert_eq!(reply.identifier(), 0x1234);
        assert_eq!(reply.sequence(), 0x0001);
        assert_eq!(reply.body(), b"payload bytes".to_vec());
    }

    #[test]
    fn error_quotes_offending_header_and_eight_bytes() {
        let offending = offending_udp_packet();
        let frame = time_exceeded(&offending, &iface(), MacAddr::new([1, 2, 3, 4, 5, 6]));

        let packet = Ipv4Packet::try_from(frame).unwrap();
        assert!(packet.validate_checksum());
        assert_eq!(packet.dest_addr(), Ipv4Addr::new(10, 0, 1, 5));
        assert_eq!(packet.ttl(), REPLY_TTL);

        let message = IcmpMessage::try_from(packet).unwrap();
        assert!(message.validate_checksum());
        assert_eq!(message.msg_type(), ICMP_TIME_EXCEEDED);
        assert_eq!(message.msg_code(), 0);

        let body = message.body();
        assert_eq!(body.len(), 20 + 8);
        assert_eq!(&body[..20], &offending.data[..20]);
        assert_eq!(&body[20..], &[0xab; 8]);
    }

    #[test]
    fn error_truncates_short_payloads() {
        let mut offending = offending_udp_packet();
        offending.set_payload(&[0xcd; 3]);
        offending.set_checksum();
        let frame = destination_unreachable(
            NET_UNREACHABLE,
            &offending,
            &iface(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
        );

        let message = IcmpMessage::try_from(Ipv4Packet::try_from(frame).unwrap()).unwrap();
        assert_eq!(message.msg_code(), NET_UNREACHABLE);
        assert_eq!(message.body().len(), 20 + 3);
    }

    #[test]
    fn no_errors_about_errors() {
        assert!(should_reply_with_error(&offending_udp_packet()));

        let error_frame = time_exceeded(
            &offending_udp_packet(),
            &iface(),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
        );
        let error_packet = Ipv4Packet::try_from(error_frame).unwrap();
        assert!(!should_reply_with_error(&error_packet));
    }

    #[test]
    fn no_errors_about_later_fragments() {
        let mut offending = offending_udp_packet();
        offending.data[6] = 0x00;
        offending.data[7] = 0x10;
        assert!(!should_reply_with_error(&offending));
    }
}
