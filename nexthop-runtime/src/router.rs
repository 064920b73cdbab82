use crate::arp::{ArpCache, ArpRequest};
use crate::icmp;
use crate::interface::{Interface, InterfaceTable};
use crate::route::RoutingTable;
use crate::transmit::FrameTransmitter;
use log::{debug, warn};
use nexthop_packets::{
    ArpFrame, ArpOp, EthernetFrame, IcmpMessage, IpProtocol, Ipv4Packet, MacAddr, ARP_ETHER_TYPE,
    ICMP_ECHO_REQUEST, IPV4_ETHER_TYPE,
};
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::time::Instant;

/// The per-frame forwarding engine. Each received frame runs one pass:
/// classify by ether type, answer ARP, and for IP either deliver locally or
/// forward toward the matched route's next hop, parking the frame in the ARP
/// cache when that hop is still unresolved.
///
/// Every failure is per-packet: malformed input is dropped, undeliverable
/// datagrams turn into ICMP errors, and nothing here takes the router down.
pub struct Router<T: FrameTransmitter> {
    interfaces: InterfaceTable,
    routes: RoutingTable,
    arp: ArpCache,
    transmitter: T,
}

impl<T: FrameTransmitter> Router<T> {
    pub fn new(interfaces: InterfaceTable, routes: RoutingTable, transmitter: T) -> Router<T> {
        Router {
            interfaces,
            routes,
            arp: ArpCache::new(),
            transmitter,
        }
    }

    pub fn arp(&self) -> &ArpCache {
        &self.arp
    }

    /// Entry point for one received frame. The buffer is only borrowed for
    /// the duration of the call; anything that must outlive it (an ARP-wait
    /// queue entry) is copied.
    pub fn handle_frame(&self, frame: &[u8], ingress: &str) {
        let ingress = match self.interfaces.get(ingress) {
            Some(iface) => iface,
            None => {
                warn!("frame received on unknown interface {:?}", ingress);
                return;
            }
        };
        let frame = match EthernetFrame::from_buffer(frame.to_vec()) {
            Ok(frame) => frame,
            Err(reason) => {
                debug!("dropping frame on {}: {}", ingress.name, reason);
                return;
            }
        };
        match frame.ether_type() {
            ARP_ETHER_TYPE => self.handle_arp(frame, ingress),
            IPV4_ETHER_TYPE => self.handle_ipv4(frame, ingress),
            other => debug!("dropping frame with unsupported ether type {:#06x}", other),
        }
    }

    /// One sweep tick: expire cache entries and retire or retransmit
    /// outstanding requests, then do the transmission the sweep decided on
    /// outside the cache lock.
    pub fn sweep(&self, now: Instant) {
        let outcome = self.arp.sweep(now);
        for target in outcome.retry {
            self.broadcast_arp_request(target);
        }
        for request in outcome.failed {
            warn!(
                "ARP for {} gave up after {} transmissions, dropping {} pending packets",
                request.ip,
                request.times_sent(),
                request.packets.len()
            );
            self.notify_host_unreachable(request);
        }
    }

    fn handle_arp(&self, frame: EthernetFrame, ingress: &Interface) {
        let arp = match ArpFrame::try_from(frame) {
            Ok(arp) => arp,
            Err(reason) => {
                debug!("dropping ARP frame on {}: {}", ingress.name, reason);
                return;
            }
        };
        // No proxy ARP: only requests and replies aimed at this router
        if !self.interfaces.owns_ip(arp.target_ip()) {
            debug!("ignoring ARP for {} (not ours)", arp.target_ip());
            return;
        }
        match arp.opcode() {
            op if op == ArpOp::Request as u16 => {
                let reply =
                    ArpFrame::reply(ingress.mac, ingress.ip, arp.sender_mac(), arp.sender_ip());
                self.transmitter.send_frame(&reply.frame().data, &ingress.name);
            }
            op if op == ArpOp::Reply as u16 => {
                let drained = self
                    .arp
                    .insert(arp.sender_mac(), arp.sender_ip(), Instant::now());
                if let Some(request) = drained {
                    self.drain_request(request, arp.sender_mac());
                }
            }
            op => warn!("dropping ARP frame with unknown opcode {}", op),
        }
    }

    // Pending frames were queued untouched; finish the forwarding work the
    // cache miss deferred: link addresses, TTL, checksum.
    fn drain_request(&self, request: ArpRequest, mac: MacAddr) {
        for pending in request.packets {
            let egress = match self.interfaces.get(&pending.interface) {
                Some(iface) => iface,
                None => continue,
            };
            let frame = match EthernetFrame::from_buffer(pending.frame) {
                Ok(frame) => frame,
                Err(_) => continue,
            };
            let mut packet = match Ipv4Packet::try_from(frame) {
                Ok(packet) => packet,
                Err(_) => continue,
            };
            packet.set_ttl(packet.ttl() - 1);
            packet.set_checksum();

            let mut frame = match EthernetFrame::try_from(packet) {
                Ok(frame) => frame,
                Err(_) => continue,
            };
            frame.set_dest_mac(mac);
            frame.set_src_mac(egress.mac);
            self.transmitter.send_frame(&frame.data, &egress.name);
        }
    }

    fn handle_ipv4(&self, frame: EthernetFrame, ingress: &Interface) {
        let sender_mac = frame.src_mac();
        let packet = match Ipv4Packet::try_from(frame) {
            Ok(packet) => packet,
            Err(reason) => {
                debug!("dropping IP packet on {}: {}", ingress.name, reason);
                return;
            }
        };
        if !packet.validate_checksum() {
            debug!("dropping IP packet with corrupt header checksum");
            return;
        }
        if packet.ttl() == 0 {
            self.send_time_exceeded(&packet, ingress, sender_mac);
            return;
        }

        if self.interfaces.owns_ip(packet.dest_addr()) {
            self.deliver_local(packet, ingress, sender_mac);
        } else {
            self.forward(packet, ingress, sender_mac);
        }
    }

    fn deliver_local(&self, packet: Ipv4Packet, ingress: &Interface, sender_mac: MacAddr) {
        match packet.protocol() {
            IpProtocol::ICMP => {
                let message = match IcmpMessage::try_from(packet) {
                    Ok(message) => message,
                    Err(reason) => {
                        debug!("dropping ICMP message: {}", reason);
                        return;
                    }
                };
                if message.msg_type() == ICMP_ECHO_REQUEST {
                    let reply = icmp::echo_reply(&message, ingress, sender_mac);
                    self.transmitter.send_frame(&reply.data, &ingress.name);
                } else {
                    debug!(
                        "ignoring ICMP type {} addressed to the router",
                        message.msg_type()
                    );
                }
            }
            protocol => {
                // No transport listeners live here
                debug!(
                    "no local handler for protocol {:?}, answering port unreachable",
                    protocol
                );
                if icmp::should_reply_with_error(&packet) {
                    let reply = icmp::destination_unreachable(
                        icmp::PORT_UNREACHABLE,
                        &packet,
                        ingress,
                        sender_mac,
                    );
                    self.transmitter.send_frame(&reply.data, &ingress.name);
                }
            }
        }
    }

    fn forward(&self, packet: Ipv4Packet, ingress: &Interface, sender_mac: MacAddr) {
        // The decrement would hit zero, so the datagram dies here instead
        if packet.ttl() <= 1 {
            self.send_time_exceeded(&packet, ingress, sender_mac);
            return;
        }
        let entry = match self.routes.lookup(packet.dest_addr()) {
            Some(entry) => entry,
            None => {
                debug!("no route to {}", packet.dest_addr());
                if icmp::should_reply_with_error(&packet) {
                    let reply = icmp::destination_unreachable(
                        icmp::NET_UNREACHABLE,
                        &packet,
                        ingress,
                        sender_mac,
                    );
                    self.transmitter.send_frame(&reply.data, &ingress.name);
                }
                return;
            }
        };
        let egress = match self.interfaces.get(&entry.interface) {
            Some(iface) => iface,
            None => {
                warn!("route names unknown interface {:?}", entry.interface);
                return;
            }
        };
        let next_hop = entry.next_hop(packet.dest_addr());

        match self.arp.lookup(next_hop, Instant::now()) {
            Some(mac) => {
                let mut packet = packet;
                packet.set_ttl(packet.ttl() - 1);
                packet.set_checksum();
                let mut frame = match EthernetFrame::try_from(packet) {
                    Ok(frame) => frame,
                    Err(_) => return,
                };
                frame.set_dest_mac(mac);
                frame.set_src_mac(egress.mac);
                self.transmitter.send_frame(&frame.data, &egress.name);
            }
            None => {
                // Park the untouched frame; the sweep emits the request and
                // the reply path finishes the rewrite.
                let frame = match EthernetFrame::try_from(packet) {
                    Ok(frame) => frame,
                    Err(_) => return,
                };
                self.arp.queue(next_hop, frame.data, &egress.name);
            }
        }
    }

    fn send_time_exceeded(&self, packet: &Ipv4Packet, ingress: &Interface, sender_mac: MacAddr) {
        debug!("TTL expired for datagram to {}", packet.dest_addr());
        if !icmp::should_reply_with_error(packet) {
            return;
        }
        let reply = icmp::time_exceeded(packet, ingress, sender_mac);
        self.transmitter.send_frame(&reply.data, &ingress.name);
    }

    fn broadcast_arp_request(&self, target: Ipv4Addr) {
        for iface in self.interfaces.iter() {
            let request = ArpFrame::request(iface.mac, iface.ip, target);
            self.transmitter.send_frame(&request.frame().data, &iface.name);
        }
    }

    // The dropped frames' senders sit behind interfaces we know routes to;
    // each notification travels through the normal forwarding machinery,
    // ARP resolution included.
    fn notify_host_unreachable(&self, request: ArpRequest) {
        for pending in request.packets {
            let frame = match EthernetFrame::from_buffer(pending.frame) {
                Ok(frame) => frame,
                Err(_) => continue,
            };
            let offending = match Ipv4Packet::try_from(frame) {
                Ok(packet) => packet,
                Err(_) => continue,
            };
            if !icmp::should_reply_with_error(&offending) {
                continue;
            }
            let source = offending.src_addr();
            let entry = match self.routes.lookup(source) {
                Some(entry) => entry,
                None => {
                    debug!("no route back to {}, dropping notification", source);
                    continue;
                }
            };
            let egress = match self.interfaces.get(&entry.interface) {
                Some(iface) => iface,
                None => continue,
            };
            let reply = icmp::destination_unreachable(
                icmp::HOST_UNREACHABLE,
                &offending,
                egress,
                MacAddr::zero(),
            );
            let next_hop = entry.next_hop(source);
            match self.arp.lookup(next_hop, Instant::now()) {
                Some(mac) => {
                    let mut reply = reply;
                    reply.set_dest_mac(mac);
                    self.transmitter.send_frame(&reply.data, &entry.interface);
                }
                None => self.arp.queue(next_hop, reply.data, &entry.interface),
            }
        }
    }
}
