use nexthop_packets::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

mod sweeper;
pub use self::sweeper::*;

/// How long a resolved entry stays usable.
pub const ENTRY_TIMEOUT: Duration = Duration::from_secs(15);
/// Minimum spacing between retransmissions of one outstanding request.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// Transmissions spent on a target before it is declared unreachable.
pub const MAX_TRANSMISSIONS: u32 = 5;

#[derive(Clone, Debug)]
struct ArpCacheEntry {
    mac: MacAddr,
    added: Instant,
}

/// A fully-formed outgoing frame parked until its next hop resolves. Owns a
/// copy of the frame bytes and remembers the interface it was bound for.
#[derive(Clone, Debug)]
pub struct PendingPacket {
    pub frame: Vec<u8>,
    pub interface: String,
}

/// The resolution state for one unresolved target: the frames waiting on it,
/// in arrival order, and the retransmission bookkeeping the sweep runs on.
#[derive(Debug)]
pub struct ArpRequest {
    pub ip: Ipv4Addr,
    pub packets: Vec<PendingPacket>,
    last_sent: Option<Instant>,
    times_sent: u32,
}

impl ArpRequest {
    pub fn times_sent(&self) -> u32 {
        self.times_sent
    }
}

/// What one sweep tick decided. All transmission implied here happens in the
/// caller, after the cache lock is gone.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Targets due for a fresh broadcast request.
    pub retry: Vec<Ipv4Addr>,
    /// Requests that exhausted their transmissions, pending packets intact.
    pub failed: Vec<ArpRequest>,
}

#[derive(Debug, Default)]
struct ArpCacheState {
    entries: HashMap<Ipv4Addr, ArpCacheEntry>,
    requests: HashMap<Ipv4Addr, ArpRequest>,
}

/// The IP-to-MAC cache plus the queues of frames waiting on unresolved
/// targets. One mutex guards all of it; no method does I/O, so the lock is
/// never held across a transmission.
///
/// Timestamps come in as arguments rather than being read off the clock so
/// the expiry and retry rules are testable; live callers pass
/// `Instant::now()`.
#[derive(Debug, Default)]
pub struct ArpCache {
    state: Mutex<ArpCacheState>,
}

impl ArpCache {
    pub fn new() -> ArpCache {
        ArpCache::default()
    }

    /// Copy of the cached MAC for `ip`, if an unexpired entry exists. Expiry
    /// is enforced here as well as at sweep time, so an entry inserted at
    /// `t` is never served at or after `t + ENTRY_TIMEOUT` regardless of
    /// sweep phase.
    pub fn lookup(&self, ip: Ipv4Addr, now: Instant) -> Option<MacAddr> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&ip)
            .filter(|entry| now.duration_since(entry.added) < ENTRY_TIMEOUT)
            .map(|entry| entry.mac)
    }

    /// Records (or refreshes) the binding for `ip` and atomically takes over
    /// any outstanding request for it. The caller owns the returned request
    /// and is responsible for rewriting and transmitting its pending
    /// packets; dropping it destroys them.
    pub fn insert(&self, mac: MacAddr, ip: Ipv4Addr, now: Instant) -> Option<ArpRequest> {
        let mut state = self.state.lock().unwrap();
        state.entries.insert(ip, ArpCacheEntry { mac, added: now });
        state.requests.remove(&ip)
    }

    /// Parks `frame` until `ip` resolves. Joins the existing request for
    /// `ip` if there is one; otherwise creates it with no transmission on
    /// record, which makes the next sweep tick send immediately.
    pub fn queue(&self, ip: Ipv4Addr, frame: Vec<u8>, interface: &str) {
        let mut state = self.state.lock().unwrap();
        let request = state.requests.entry(ip).or_insert_with(|| ArpRequest {
            ip,
            packets: Vec::new(),
            last_sent: None,
            times_sent: 0,
        });
        request.packets.push(PendingPacket {
            frame,
            interface: interface.to_string(),
        });
    }

    /// One sweep tick: expire stale entries, then walk the outstanding
    /// requests. A request whose last transmission is unset or older than
    /// `RETRY_INTERVAL` either gets marked for retransmission or, once its
    /// budget is spent, is removed and handed back for unreachable
    /// notification.
    pub fn sweep(&self, now: Instant) -> SweepOutcome {
        let mut state = self.state.lock().unwrap();
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.added) < ENTRY_TIMEOUT);

        let due: Vec<Ipv4Addr> = state
            .requests
            .values()
            .filter(|request| {
                request
                    .last_sent
                    .map_or(true, |sent| now.duration_since(sent) >= RETRY_INTERVAL)
            })
            .map(|request| request.ip)
            .collect();

        let mut outcome = SweepOutcome::default();
        for ip in due {
            if state.requests[&ip].times_sent >= MAX_TRANSMISSIONS {
                outcome.failed.push(state.requests.remove(&ip).unwrap());
            } else {
                let request = state.requests.get_mut(&ip).unwrap();
                request.times_sent += 1;
                request.last_sent = Some(now);
                outcome.retry.push(ip);
            }
        }
        outcome
    }
}
