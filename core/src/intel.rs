//! # IP Intelligence Store
//!
//! Attribution of addresses to ASN, organization and country, loaded once
//! from tabular datasets and read-only afterwards. The store is passed down
//! explicitly to whatever needs it; there is no process-global instance.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use dpiprobe_common::error::FilterError;
use dpiprobe_common::net::set::AddrSet;

mod geolite;

pub use geolite::{GeoliteOpt, GeoliteStore, LoadError};

#[cfg(test)]
pub(crate) use geolite::test_store;

/// Criteria for [`IntelLookup::cidrs`]. Every field is optional; a record's
/// prefix is selected when **any** populated field matches it. A fully empty
/// query selects nothing, never everything.
#[derive(Debug, Clone, Default)]
pub struct CidrQuery {
    /// Reserved for hostname expansion; querying it is an error for now.
    pub hosts: Vec<String>,
    pub ips: Vec<Ipv4Addr>,
    pub asns: Vec<u32>,
    /// Matched case-insensitively as substrings of the organization name.
    pub org_terms: Vec<String>,
    pub country_codes: Vec<String>,
}

/// Attribution of a single address: the fields of the most specific loaded
/// prefix containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpInfo {
    pub ip: Ipv4Addr,
    pub asn: u32,
    pub subnet: Ipv4Network,
    pub org: String,
    pub country_iso: String,
}

/// Read-only attribution queries. Implementations are safe for concurrent
/// use once constructed.
pub trait IntelLookup: Send + Sync {
    /// Union of prefixes satisfying at least one populated criterion.
    fn cidrs(&self, query: &CidrQuery) -> Result<AddrSet, FilterError>;

    /// Unique, sorted ASNs whose prefix contains any given address.
    fn asns(&self, ips: &[Ipv4Addr]) -> Vec<u32>;

    /// Unique organization names attributed to any given address or ASN,
    /// in load order.
    fn org_terms(&self, ips: &[Ipv4Addr], asns: &[u32]) -> Vec<String>;

    /// ISO code of the most specific country prefix containing the address;
    /// empty when nothing matches.
    fn country_iso(&self, ip: Ipv4Addr) -> String;

    /// Longest-prefix-match attribution; a zero record with the `0.0.0.0/0`
    /// subnet when nothing matches.
    fn ip_info(&self, ip: Ipv4Addr) -> IpInfo;
}
