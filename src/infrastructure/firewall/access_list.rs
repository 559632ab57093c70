//! IP allow/deny lists.

use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::debug;

/// A deny range: either an inclusive `start end` span or a CIDR network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpRange {
    Span { start: IpAddr, end: IpAddr },
    Network(IpNetwork),
}

impl IpRange {
    /// Parses `start end` or `a.b.c.d/n`. Returns `None` for malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let first = parts.next()?;
        match parts.next() {
            Some(second) => {
                let start = first.parse::<IpAddr>().ok()?.to_canonical();
                let end = second.parse::<IpAddr>().ok()?.to_canonical();
                if start.is_ipv4() != end.is_ipv4() {
                    return None;
                }
                Some(Self::Span { start, end })
            }
            None if first.contains('/') => first.parse().ok().map(Self::Network),
            None => None,
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        match self {
            Self::Network(net) => net.contains(ip),
            Self::Span { start, end } => match (ip, start, end) {
                (IpAddr::V4(ip), IpAddr::V4(s), IpAddr::V4(e)) => {
                    (u32::from(*s)..=u32::from(*e)).contains(&u32::from(ip))
                }
                (IpAddr::V6(ip), IpAddr::V6(s), IpAddr::V6(e)) => {
                    (u128::from(*s)..=u128::from(*e)).contains(&u128::from(ip))
                }
                _ => false,
            },
        }
    }
}

/// Whitelist, deny list and deny ranges, as loaded from the rule files.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    whitelist: HashSet<IpAddr>,
    denied: HashSet<IpAddr>,
    ranges: Vec<IpRange>,
}

impl AccessList {
    pub fn new(whitelist: HashSet<IpAddr>, denied: HashSet<IpAddr>, ranges: Vec<IpRange>) -> Self {
        Self {
            whitelist,
            denied,
            ranges,
        }
    }

    /// Builds the list from the raw contents of `whitelist.txt`, `denyip.txt`
    /// and `DenyIPRange.txt`.
    pub fn parse(whitelist: &str, deny: &str, ranges: &str) -> Self {
        let whitelist = parse_addresses(whitelist.split([',', '，']));
        let denied = parse_addresses(deny.split(|c: char| c == ',' || c == '，' || c.is_whitespace()));
        let ranges = ranges
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|line| {
                let range = IpRange::parse(line);
                if range.is_none() {
                    debug!("Skipping malformed deny range {:?}", line);
                }
                range
            })
            .collect();

        Self::new(whitelist, denied, ranges)
    }

    /// Whitelisted addresses are never denied; otherwise the address is denied
    /// when it is listed or falls inside a deny range.
    ///
    /// IPv4-mapped IPv6 addresses are matched as their IPv4 form.
    pub fn is_denied(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        if self.whitelist.contains(&ip) {
            return false;
        }
        self.denied.contains(&ip) || self.ranges.iter().any(|r| r.contains(ip))
    }

    pub fn is_whitelisted(&self, ip: IpAddr) -> bool {
        self.whitelist.contains(&ip.to_canonical())
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.whitelist.len(), self.denied.len(), self.ranges.len())
    }
}

fn parse_addresses<'a>(items: impl Iterator<Item = &'a str>) -> HashSet<IpAddr> {
    items
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical())
        .collect()
}
