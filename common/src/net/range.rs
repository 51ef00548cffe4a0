use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

/// An inclusive range of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        if start_addr <= end_addr {
            Self { start_addr, end_addr }
        } else {
            Self { start_addr: end_addr, end_addr: start_addr }
        }
    }

    /// The full range covered by a CIDR block, network and broadcast included.
    pub fn from_cidr(net: Ipv4Network) -> Self {
        Self::new(net.network(), net.broadcast())
    }

    pub fn first_u32(&self) -> u32 {
        self.start_addr.into()
    }

    pub fn last_u32(&self) -> u32 {
        self.end_addr.into()
    }

    /// Number of addresses in the range. Never zero; the whole v4 space
    /// does not fit in u32, hence u64.
    pub fn len(&self) -> u64 {
        u64::from(self.last_u32()) - u64::from(self.first_u32()) + 1
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.start_addr <= ip && ip <= self.end_addr
    }

    /// The address `offset` positions past the start, if still inside.
    pub fn nth(&self, offset: u64) -> Option<Ipv4Addr> {
        if offset >= self.len() {
            return None;
        }
        Some(Ipv4Addr::from(self.first_u32() + offset as u32))
    }

    /// Minimal CIDR cover of the range: the classic greedy walk that takes
    /// the largest aligned power-of-two block fitting at the cursor.
    pub fn to_prefixes(&self) -> Vec<Ipv4Network> {
        let mut out = Vec::new();
        let mut cur = u64::from(self.first_u32());
        let end = u64::from(self.last_u32());

        while cur <= end {
            let align_bits = cur.trailing_zeros().min(32);
            let remaining = end - cur + 1;
            let fit_bits = 63 - remaining.leading_zeros();
            let bits = align_bits.min(fit_bits);
            let prefix = (32 - bits) as u8;
            if let Ok(net) = Ipv4Network::new(Ipv4Addr::from(cur as u32), prefix) {
                out.push(net);
            }
            cur += 1u64 << bits;
        }

        out
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn range_len_counts_both_ends() {
        let r = Ipv4Range::new(ip("10.0.0.1"), ip("10.0.0.3"));
        assert_eq!(r.len(), 3);

        let whole = Ipv4Range::new(ip("0.0.0.0"), ip("255.255.255.255"));
        assert_eq!(whole.len(), 1u64 << 32);
    }

    #[test]
    fn range_from_cidr_spans_network_to_broadcast() {
        let net: Ipv4Network = "192.168.0.0/16".parse().unwrap();
        let r = Ipv4Range::from_cidr(net);
        assert_eq!(r.start_addr, ip("192.168.0.0"));
        assert_eq!(r.end_addr, ip("192.168.255.255"));
        assert_eq!(r.len(), 1 << 16);
    }

    #[test]
    fn range_nth_offsets_into_the_range() {
        let r = Ipv4Range::new(ip("10.0.0.0"), ip("10.0.0.255"));
        assert_eq!(r.nth(0), Some(ip("10.0.0.0")));
        assert_eq!(r.nth(255), Some(ip("10.0.0.255")));
        assert_eq!(r.nth(256), None);
    }

    #[test]
    fn prefixes_cover_aligned_range_with_single_block() {
        let r = Ipv4Range::new(ip("10.0.0.0"), ip("10.0.0.255"));
        let got: Vec<String> = r.to_prefixes().iter().map(|p| p.to_string()).collect();
        assert_eq!(got, vec!["10.0.0.0/24"]);
    }

    #[test]
    fn prefixes_cover_unaligned_range_minimally() {
        let r = Ipv4Range::new(ip("10.0.0.1"), ip("10.0.0.4"));
        let got: Vec<String> = r.to_prefixes().iter().map(|p| p.to_string()).collect();
        assert_eq!(got, vec!["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/32"]);
    }

    #[test]
    fn reversed_bounds_are_normalized() {
        let r = Ipv4Range::new(ip("10.0.0.9"), ip("10.0.0.1"));
        assert_eq!(r.start_addr, ip("10.0.0.1"));
        assert_eq!(r.end_addr, ip("10.0.0.9"));
    }
}
