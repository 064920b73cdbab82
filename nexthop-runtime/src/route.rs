use std::net::Ipv4Addr;
use std::str::FromStr;

/// Static route: a destination network, the gateway to reach it through (or
/// 0.0.0.0 for a directly attached network), and the egress interface name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub dest: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub interface: String,
}

impl RouteEntry {
    pub fn new(dest: Ipv4Addr, gateway: Ipv4Addr, mask: Ipv4Addr, interface: &str) -> RouteEntry {
        RouteEntry {
            dest,
            gateway,
            mask,
            interface: interface.to_string(),
        }
    }

    pub fn matches(&self, ip: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        u32::from(ip) & mask == u32::from(self.dest) & mask
    }

    /// The address the next link-layer hop answers ARP for: the gateway when
    /// one is set, otherwise the destination itself.
    pub fn next_hop(&self, dest: Ipv4Addr) -> Ipv4Addr {
        if self.gateway.is_unspecified() {
            dest
        } else {
            self.gateway
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    routes: Vec<RouteEntry>,
}

impl RoutingTable {
    pub fn new(routes: Vec<RouteEntry>) -> RoutingTable {
        RoutingTable { routes }
    }

    pub fn add_route(&mut self, route: RouteEntry) {
        self.routes.push(route);
    }

    /// Longest-prefix match: of all entries covering `dest`, the one with
    /// the most specific mask wins. No match means undeliverable.
    pub fn lookup(&self, dest: Ipv4Addr) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .filter(|route| route.matches(dest))
            .max_by_key(|route| u32::from(route.mask))
    }
}

/// Parses the whitespace-separated rtable file format: one
/// `destination gateway mask interface` entry per line, `#` comments and
/// blank lines skipped.
impl FromStr for RoutingTable {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<RoutingTable, Self::Err> {
        let mut table = RoutingTable::default();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let dest = parse_addr(fields.next())?;
            let gateway = parse_addr(fields.next())?;
            let mask = parse_addr(fields.next())?;
            let interface = fields.next().ok_or("Route entry is missing its interface")?;
            if fields.next().is_some() {
                return Err("Route entry has trailing fields");
            }
            table.add_route(RouteEntry::new(dest, gateway, mask, interface));
        }
        Ok(table)
    }
}

fn parse_addr(field: Option<&str>) -> Result<Ipv4Addr, &'static str> {
    field
        .ok_or("Route entry is missing an address field")?
        .parse()
        .map_err(|_| "Route entry has a malformed address")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        RoutingTable::new(vec![
            RouteEntry::new(
                Ipv4Addr::new(0, 0, 0, 0),
                Ipv4Addr::new(10, 0, 1, 254),
                Ipv4Addr::new(0, 0, 0, 0),
                "eth0",
            ),
            RouteEntry::new(
                Ipv4Addr::new(10, 0, 1, 0),
                Ipv4Addr::new(0, 0, 0, 0),
                Ipv4Addr::new(255, 255, 255, 0),
                "eth1",
            ),
            RouteEntry::new(
                Ipv4Addr::new(10, 0, 1, 128),
                Ipv4Addr::new(0, 0, 0, 0),
                Ipv4Addr::new(255, 255, 255, 128),
                "eth2",
            ),
        ])
    }

    #[test]
    fn most_specific_mask_wins() {
        let table = table();
        let entry = table.lookup(Ipv4Addr::new(10, 0, 1, 200)).unwrap();
        assert_eq!(entry.interface, "eth2");
        let entry = table.lookup(Ipv4Addr::new(10, 0, 1, 5)).unwrap();
        assert_eq!(entry.interface, "eth1");
    }

    #[test]
    fn default_route_catches_the_rest() {
        let table = table();
        let entry = table.lookup(Ipv4Addr::new(192, 168, 7, 7)).unwrap();
        assert_eq!(entry.interface, "eth0");
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table = RoutingTable::default();
        assert!(table.lookup(Ipv4Addr::new(10, 0, 1, 1)).is_none());
    }

    #[test]
    fn next_hop_prefers_gateway() {
        let table = table();
        let dest = Ipv4Addr::new(192, 168, 7, 7);
        let entry = table.lookup(dest).unwrap();
        assert_eq!(entry.next_hop(dest), Ipv4Addr::new(10, 0, 1, 254));

        let dest = Ipv4Addr::new(10, 0, 1, 5);
        let entry = table.lookup(dest).unwrap();
        assert_eq!(entry.next_hop(dest), dest);
    }

    #[test]
    fn parses_table_file() {
        let text = "\
# destination  gateway     mask             interface
0.0.0.0        10.0.1.254  0.0.0.0          eth0
10.0.1.0       0.0.0.0     255.255.255.0    eth1
";
        let table: RoutingTable = text.parse().unwrap();
        assert_eq!(table.routes.len(), 2);
        assert_eq!(table.routes[0].gateway, Ipv4Addr::new(10, 0, 1, 254));
        assert_eq!(table.routes[1].interface, "eth1");
    }

    #[test]
    fn rejects_malformed_line() {
        assert!("10.0.1.0 0.0.0.0 eth1".parse::<RoutingTable>().is_err());
        assert!("10.0.1.0 bogus 255.255.255.0 eth1"
            .parse::<RoutingTable>()
            .is_err());
    }
}
