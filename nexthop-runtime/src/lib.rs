/// Interfaces are the router's ports: a stable name bound to the hardware and protocol addresses
/// the router answers for on that link. The table is built once at startup and read everywhere,
/// by name or through the "is this IP mine" predicate that decides local delivery.
pub mod interface;

/// The static routing table. Transit traffic is matched against destination prefixes with a
/// longest-prefix-match rule; the winning entry names the egress interface and, for networks that
/// are not directly attached, the gateway to hand the datagram to.
pub mod route;

/// The ARP cache and resolver. Resolved IP-to-MAC bindings expire after a fixed lifetime;
/// unresolved targets hold a queue of fully-formed frames waiting on resolution, retried by a
/// periodic sweep until a reply arrives or the retry budget runs out.
pub mod arp;

/// Builders for the control messages the router originates: echo replies for pings addressed to
/// it, and the time-exceeded/unreachable errors the forwarding path produces.
pub mod icmp;

/// The per-frame forwarding engine. Every received frame runs one pass of the state machine:
/// classify, validate, answer or forward, queueing on unresolved next hops.
pub mod router;

/// The boundary to the physical frame I/O layer, plus a channel-backed implementation for tests
/// and embedders that collect egress traffic themselves.
pub mod transmit;
