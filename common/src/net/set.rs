//! # Coalesced Address Sets
//!
//! [`AddrSet`] is an ordered collection of disjoint, coalesced IPv4 ranges.
//! Invariant: after any builder operation no range overlaps or touches
//! another, so the prefix list derived from a set is minimal and two sets
//! selecting the same addresses always compare equal.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use crate::net::range::Ipv4Range;

/// An immutable set of IPv4 addresses held as sorted disjoint ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrSet {
    ranges: Vec<Ipv4Range>,
}

impl AddrSet {
    pub fn ranges(&self) -> &[Ipv4Range] {
        &self.ranges
    }

    /// Minimal CIDR cover of the whole set, in address order.
    pub fn prefixes(&self) -> Vec<Ipv4Network> {
        self.ranges.iter().flat_map(|r| r.to_prefixes()).collect()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if r.end_addr < ip {
                    std::cmp::Ordering::Less
                } else if r.start_addr > ip {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Total number of addresses across all ranges.
    pub fn addr_count(&self) -> u64 {
        self.ranges.iter().map(Ipv4Range::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn union(&self, other: &AddrSet) -> AddrSet {
        let mut b = AddrSetBuilder::new();
        b.add_set(self);
        b.add_set(other);
        b.build()
    }

    /// Two-pointer sweep over both sorted range lists.
    pub fn intersection(&self, other: &AddrSet) -> AddrSet {
        let (a, b) = (&self.ranges, &other.ranges);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            let lo = a[i].start_addr.max(b[j].start_addr);
            let hi = a[i].end_addr.min(b[j].end_addr);
            if lo <= hi {
                out.push(Ipv4Range::new(lo, hi));
            }
            if a[i].end_addr < b[j].end_addr {
                i += 1;
            } else {
                j += 1;
            }
        }

        // Overlap slices of disjoint inputs stay disjoint and ordered.
        AddrSet { ranges: out }
    }
}

/// Accumulates ranges in any order; [`AddrSetBuilder::build`] normalizes.
#[derive(Debug, Default)]
pub struct AddrSetBuilder {
    ranges: Vec<Ipv4Range>,
}

impl AddrSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prefix(&mut self, net: Ipv4Network) {
        self.ranges.push(Ipv4Range::from_cidr(net));
    }

    pub fn add_addr(&mut self, ip: Ipv4Addr) {
        self.ranges.push(Ipv4Range::new(ip, ip));
    }

    pub fn add_range(&mut self, range: Ipv4Range) {
        self.ranges.push(range);
    }

    pub fn add_set(&mut self, set: &AddrSet) {
        self.ranges.extend_from_slice(set.ranges());
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Sorts by start address and merges every overlapping or adjacent
    /// pair, so redundant inputs (a /24 inside an already-added /21)
    /// disappear.
    pub fn build(mut self) -> AddrSet {
        if self.ranges.is_empty() {
            return AddrSet::default();
        }

        self.ranges.sort_by_key(Ipv4Range::first_u32);

        let mut merged: Vec<Ipv4Range> = Vec::with_capacity(self.ranges.len());
        for r in self.ranges {
            match merged.last_mut() {
                Some(last) if u64::from(r.first_u32()) <= u64::from(last.last_u32()) + 1 => {
                    if r.end_addr > last.end_addr {
                        last.end_addr = r.end_addr;
                    }
                }
                _ => merged.push(r),
            }
        }

        AddrSet { ranges: merged }
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

    fn set_of(cidrs: &[&str]) -> AddrSet {
        let mut b = AddrSetBuilder::new();
        for c in cidrs {
            b.add_prefix(c.parse().unwrap());
        }
        b.build()
    }

    fn prefix_strings(s: &AddrSet) -> Vec<String> {
        s.prefixes().iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn builder_coalesces_nested_prefixes() {
        let s = set_of(&["31.44.8.0/21", "31.44.8.0/24"]);
        assert_eq!(prefix_strings(&s), vec!["31.44.8.0/21"]);
    }

    #[test]
    fn builder_merges_adjacent_prefixes() {
        let s = set_of(&["10.0.0.0/24", "10.0.1.0/24"]);
        assert_eq!(prefix_strings(&s), vec!["10.0.0.0/23"]);
    }

    #[test]
    fn coalescing_law_output_is_disjoint_and_complete() {
        let inputs = ["10.0.0.0/25", "10.0.0.64/26", "10.0.1.0/24", "192.168.0.1/32"];
        let s = set_of(&inputs);

        for w in s.ranges().windows(2) {
            assert!(
                u64::from(w[0].last_u32()) + 1 < u64::from(w[1].first_u32()),
                "ranges {w:?} overlap or touch"
            );
        }

        let input_count: u64 = inputs
            .iter()
            .map(|c| Ipv4Range::from_cidr(c.parse().unwrap()).len())
            .sum();
        // /26 nested in /25 and /24 adjacent to nothing: 128 + 256 + 1
        assert_eq!(s.addr_count(), 385);
        assert!(s.addr_count() <= input_count);
    }

    #[test]
    fn empty_builder_builds_empty_set() {
        let s = AddrSetBuilder::new().build();
        assert!(s.is_empty());
        assert_eq!(s.addr_count(), 0);
        assert!(s.prefixes().is_empty());
    }

    #[test]
    fn contains_hits_only_member_addresses() {
        let s = set_of(&["10.0.0.0/24", "192.168.1.0/30"]);
        assert!(s.contains("10.0.0.77".parse().unwrap()));
        assert!(s.contains("192.168.1.3".parse().unwrap()));
        assert!(!s.contains("192.168.1.4".parse().unwrap()));
        assert!(!s.contains("11.0.0.1".parse().unwrap()));
    }

    #[test]
    fn union_is_commutative_and_coalesced() {
        let a = set_of(&["10.0.0.0/24"]);
        let b = set_of(&["10.0.1.0/24", "172.16.0.0/16"]);
        let ab = a.union(&b);
        assert_eq!(ab, b.union(&a));
        assert_eq!(prefix_strings(&ab), vec!["10.0.0.0/23", "172.16.0.0/16"]);
    }

    #[test]
    fn intersection_keeps_only_shared_addresses() {
        let a = set_of(&["10.0.0.0/16", "192.168.0.0/24"]);
        let b = set_of(&["10.0.128.0/17", "192.168.0.128/25"]);
        let got = a.intersection(&b);
        assert_eq!(prefix_strings(&got), vec!["10.0.128.0/17", "192.168.0.128/25"]);

        let disjoint = set_of(&["172.16.0.0/16"]);
        assert!(a.intersection(&disjoint).is_empty());
    }

    #[test]
    fn intersection_is_subset_of_both_operands() {
        let a = set_of(&["10.0.0.0/8"]);
        let b = set_of(&["10.1.2.0/24", "11.0.0.0/24"]);
        let got = a.intersection(&b);
        assert_eq!(prefix_strings(&got), vec!["10.1.2.0/24"]);
        for r in got.ranges() {
            assert!(a.contains(r.start_addr) && a.contains(r.end_addr));
            assert!(b.contains(r.start_addr) && b.contains(r.end_addr));
        }
    }
}
