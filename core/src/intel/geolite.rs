//! GeoLite2-CSV backed implementation of the intelligence store.
//!
//! Three datasets are read once at construction:
//!
//! * attribution: `[cidr, asn, organization]`
//! * country: `[cidr, geoname ids at columns 1..=3]` — the first non-zero
//!   id wins
//! * locations: `[geoname id, .., iso code at column 4]` — the join table
//!
//! A missing or headerless file is fatal. A malformed row is reported and
//! skipped, so one bad line cannot take the whole dataset down. Queries are
//! linear scans over the loaded records, which is fine at interactive rates.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use ipnetwork::Ipv4Network;
use thiserror::Error;

use dpiprobe_common::error::FilterError;
use dpiprobe_common::net::set::{AddrSet, AddrSetBuilder};
use dpiprobe_common::{info, warn};

use super::{CidrQuery, IntelLookup, IpInfo};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("dataset {path} is missing its header row")]
    MissingHeader { path: PathBuf },
}

/// Paths of the three datasets.
#[derive(Debug, Clone)]
pub struct GeoliteOpt {
    pub asn_path: PathBuf,
    pub country_path: PathBuf,
    pub locations_path: PathBuf,
}

#[derive(Debug, Clone)]
struct AsnRecord {
    net: Ipv4Network,
    asn: u32,
    org: String,
}

#[derive(Debug, Clone)]
struct CountryRecord {
    net: Ipv4Network,
    iso: String,
}

/// The loaded store. Immutable after [`GeoliteStore::load`]; all queries
/// take `&self`.
#[derive(Debug)]
pub struct GeoliteStore {
    asn_records: Vec<AsnRecord>,
    country_records: Vec<CountryRecord>,
}

impl GeoliteStore {
    pub fn load(opt: &GeoliteOpt) -> Result<Self, LoadError> {
        let locations = load_locations(&opt.locations_path)?;
        let asn_records = load_rows(&opt.asn_path, parse_asn_row)?;
        let country_records =
            load_rows(&opt.country_path, |row| parse_country_row(row, &locations))?;

        info!(
            "loaded {} attribution and {} country prefixes",
            asn_records.len(),
            country_records.len()
        );

        Ok(Self { asn_records, country_records })
    }
}

impl IntelLookup for GeoliteStore {
    fn cidrs(&self, query: &CidrQuery) -> Result<AddrSet, FilterError> {
        if !query.hosts.is_empty() {
            return Err(FilterError::Eval(
                "host(): hostname expansion is not implemented".into(),
            ));
        }

        let mut b = AddrSetBuilder::new();

        if !query.ips.is_empty() || !query.asns.is_empty() || !query.org_terms.is_empty() {
            let terms: Vec<String> =
                query.org_terms.iter().map(|t| t.to_lowercase()).collect();

            for rec in &self.asn_records {
                let org = rec.org.to_lowercase();
                let hit = query.ips.iter().any(|ip| rec.net.contains(*ip))
                    || query.asns.contains(&rec.asn)
                    || terms.iter().any(|t| org.contains(t.as_str()));
                if hit {
                    b.add_prefix(rec.net);
                }
            }
        }

        if !query.country_codes.is_empty() {
            let codes: Vec<String> =
                query.country_codes.iter().map(|c| c.to_uppercase()).collect();

            for rec in &self.country_records {
                if codes.iter().any(|c| *c == rec.iso) {
                    b.add_prefix(rec.net);
                }
            }
        }

        Ok(b.build())
    }

    fn asns(&self, ips: &[Ipv4Addr]) -> Vec<u32> {
        if ips.is_empty() {
            return Vec::new();
        }

        let mut asns: Vec<u32> = self
            .asn_records
            .iter()
            .filter(|rec| ips.iter().any(|ip| rec.net.contains(*ip)))
            .map(|rec| rec.asn)
            .collect();
        asns.sort_unstable();
        asns.dedup();
        asns
    }

    fn org_terms(&self, ips: &[Ipv4Addr], asns: &[u32]) -> Vec<String> {
        if ips.is_empty() && asns.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for rec in &self.asn_records {
            let hit = ips.iter().any(|ip| rec.net.contains(*ip)) || asns.contains(&rec.asn);
            if hit && seen.insert(rec.org.clone()) {
                terms.push(rec.org.clone());
            }
        }
        terms
    }

    fn country_iso(&self, ip: Ipv4Addr) -> String {
        let mut best = universal_prefix();
        let mut iso = String::new();
        for rec in &self.country_records {
            if rec.net.contains(ip) && best.prefix() < rec.net.prefix() {
                best = rec.net;
                iso = rec.iso.clone();
            }
        }
        iso
    }

    fn ip_info(&self, ip: Ipv4Addr) -> IpInfo {
        let mut info = IpInfo {
            ip,
            asn: 0,
            subnet: universal_prefix(),
            org: String::new(),
            country_iso: self.country_iso(ip),
        };

        // Strictly-longer replaces, so on equal lengths the earliest-loaded
        // record stands.
        for rec in &self.asn_records {
            if rec.net.contains(ip) && info.subnet.prefix() < rec.net.prefix() {
                info.subnet = rec.net;
                info.asn = rec.asn;
                info.org = rec.org.clone();
            }
        }

        info
    }
}

fn universal_prefix() -> Ipv4Network {
    Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0).expect("/0 prefix is always valid")
}

/// Reads a dataset row by row: the first record is the header, each later
/// record goes through `parse`; rows it rejects are logged and skipped.
fn load_rows<T>(
    path: &Path,
    parse: impl Fn(&StringRecord) -> Option<T>,
) -> Result<Vec<T>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| LoadError::Read { path: path.to_path_buf(), source })?;

    let mut out = Vec::new();
    let mut saw_header = false;

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(source) => {
                return Err(LoadError::Read { path: path.to_path_buf(), source });
            }
        };

        if !saw_header {
            saw_header = true;
            continue;
        }

        // IPv6 blocks are out of scope and not an anomaly worth logging.
        if record.get(0).is_some_and(|c| c.contains(':')) {
            continue;
        }

        match parse(&record) {
            Some(v) => out.push(v),
            None => warn!("{}: skipping malformed row {}", path.display(), line + 1),
        }
    }

    if !saw_header {
        return Err(LoadError::MissingHeader { path: path.to_path_buf() });
    }

    Ok(out)
}

fn parse_asn_row(record: &StringRecord) -> Option<AsnRecord> {
    if record.len() < 3 {
        return None;
    }
    let net: Ipv4Network = record.get(0)?.parse().ok()?;
    let asn: u32 = record.get(1)?.parse().ok()?;
    let org = record.get(2)?.to_string();
    Some(AsnRecord { net, asn, org })
}

fn parse_country_row(
    record: &StringRecord,
    locations: &HashMap<u32, String>,
) -> Option<CountryRecord> {
    if record.len() < 4 {
        return None;
    }
    let net: Ipv4Network = record.get(0)?.parse().ok()?;

    let mut geoname_id = 0;
    for col in 1..=3 {
        geoname_id = parse_geoname_id(record.get(col)?)?;
        if geoname_id != 0 {
            break;
        }
    }

    let iso = locations.get(&geoname_id).cloned().unwrap_or_default();
    Some(CountryRecord { net, iso })
}

fn parse_geoname_id(field: &str) -> Option<u32> {
    if field.is_empty() {
        return Some(0);
    }
    field.parse().ok()
}

fn load_locations(path: &Path) -> Result<HashMap<u32, String>, LoadError> {
    let rows = load_rows(path, |record| {
        if record.len() < 5 {
            return None;
        }
        let geoname_id: u32 = record.get(0)?.parse().ok()?;
        let iso = record.get(4)?.to_string();
        Some((geoname_id, iso))
    })?;

    Ok(rows.into_iter().collect())
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
pub(crate) fn test_store() -> GeoliteStore {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/geolite");
    GeoliteStore::load(&GeoliteOpt {
        asn_path: root.join("cidr2as_ipv4.csv"),
        country_path: root.join("cidr2country_ipv4.csv"),
        locations_path: root.join("locations_en.csv"),
    })
    .expect("test fixtures should load")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn prefix_strings(set: &AddrSet) -> Vec<String> {
        set.prefixes().iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn ip_info_prefers_longest_prefix() {
        let store = test_store();
        let got = store.ip_info(ip("31.44.8.1"));
        assert_eq!(
            got,
            IpInfo {
                ip: ip("31.44.8.1"),
                asn: 200351,
                subnet: "31.44.8.0/24".parse().unwrap(),
                org: "Yandex.Cloud LLC".into(),
                country_iso: "RU".into(),
            }
        );
    }

    #[test]
    fn ip_info_unmatched_returns_zero_record() {
        let store = test_store();
        let got = store.ip_info(ip("8.8.8.8"));
        assert_eq!(got.asn, 0);
        assert_eq!(got.subnet.to_string(), "0.0.0.0/0");
        assert_eq!(got.org, "");
        assert_eq!(got.country_iso, "");
    }

    #[test]
    fn ip_info_equal_length_tie_keeps_earliest_loaded() {
        let store = GeoliteStore {
            asn_records: vec![
                AsnRecord { net: "10.0.0.0/24".parse().unwrap(), asn: 1, org: "first".into() },
                AsnRecord { net: "10.0.0.0/24".parse().unwrap(), asn: 2, org: "second".into() },
            ],
            country_records: Vec::new(),
        };
        let got = store.ip_info(ip("10.0.0.7"));
        assert_eq!(got.asn, 1);
        assert_eq!(got.org, "first");
    }

    #[test]
    fn country_iso_follows_longest_prefix_match() {
        let store = test_store();
        assert_eq!(store.country_iso(ip("31.44.8.1")), "RU");
        assert_eq!(store.country_iso(ip("1.0.0.7")), "AU");
        assert_eq!(store.country_iso(ip("8.8.8.8")), "");
    }

    #[test]
    fn asns_are_unique_and_sorted() {
        let store = test_store();
        let got = store.asns(&[ip("31.44.8.24"), ip("193.186.4.17")]);
        assert_eq!(got, vec![15169, 200350, 200351]);
    }

    #[test]
    fn cidrs_by_ip_coalesces_nested_prefixes() {
        let store = test_store();
        let query = CidrQuery {
            ips: vec![ip("31.44.8.24"), ip("193.186.4.17")],
            ..CidrQuery::default()
        };
        let got = store.cidrs(&query).unwrap();
        assert_eq!(prefix_strings(&got), vec!["31.44.8.0/21", "193.186.4.0/24"]);
    }

    #[test]
    fn cidrs_org_terms_are_case_insensitive() {
        let store = test_store();
        let want = vec![
            "1.179.112.0/20",
            "2.56.250.0/24",
            "34.0.128.0/19",
            "193.186.4.0/24",
        ];

        for spelling in ["google", "Google", "GOOGLE"] {
            let query =
                CidrQuery { org_terms: vec![spelling.into()], ..CidrQuery::default() };
            let got = store.cidrs(&query).unwrap();
            assert_eq!(prefix_strings(&got), want, "spelling {spelling:?}");
        }
    }

    #[test]
    fn cidrs_country_codes_are_case_insensitive() {
        let store = test_store();
        let query =
            CidrQuery { country_codes: vec!["us".into(), "AU".into()], ..CidrQuery::default() };
        let got = store.cidrs(&query).unwrap();
        assert_eq!(
            prefix_strings(&got),
            vec!["1.0.0.0/24", "34.0.128.0/19", "68.169.48.0/20"]
        );
    }

    #[test]
    fn cidrs_empty_query_selects_nothing() {
        let store = test_store();
        let got = store.cidrs(&CidrQuery::default()).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn cidrs_hosts_criterion_is_rejected() {
        let store = test_store();
        let query = CidrQuery { hosts: vec!["example.org".into()], ..CidrQuery::default() };
        assert!(matches!(store.cidrs(&query), Err(FilterError::Eval(_))));
    }

    #[test]
    fn org_terms_resolve_from_ips_and_asns() {
        let store = test_store();
        let got = store.org_terms(&[ip("31.44.8.24")], &[13238]);
        assert_eq!(
            got,
            vec![
                "Yandex LLC".to_string(),
                "Yandex Enterprise Network".to_string(),
                "Yandex.Cloud LLC".to_string(),
            ]
        );
    }

    #[test]
    fn load_skips_malformed_rows() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/geolite");
        let store = GeoliteStore::load(&GeoliteOpt {
            asn_path: root.join("cidr2as_malformed.csv"),
            country_path: root.join("cidr2country_ipv4.csv"),
            locations_path: root.join("locations_en.csv"),
        })
        .unwrap();

        // 5 data rows, 3 of them broken
        assert_eq!(store.asn_records.len(), 2);
        assert_eq!(store.ip_info(ip("192.0.2.9")).asn, 64514);
    }

    #[test]
    fn load_fails_on_missing_file() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/geolite");
        let err = GeoliteStore::load(&GeoliteOpt {
            asn_path: root.join("does_not_exist.csv"),
            country_path: root.join("cidr2country_ipv4.csv"),
            locations_path: root.join("locations_en.csv"),
        })
        .unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
