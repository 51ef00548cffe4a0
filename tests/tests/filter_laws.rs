//! Store and filter-engine laws over the shared dataset fixtures.

use std::path::Path;

use dpiprobe_common::net::set::AddrSet;
use dpiprobe_core::filter::{self, FilterEngine};
use dpiprobe_core::intel::{CidrQuery, GeoliteOpt, GeoliteStore, IntelLookup};

fn fixture_store() -> GeoliteStore {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../core/testdata/geolite");
    GeoliteStore::load(&GeoliteOpt {
        asn_path: root.join("cidr2as_ipv4.csv"),
        country_path: root.join("cidr2country_ipv4.csv"),
        locations_path: root.join("locations_en.csv"),
    })
    .expect("fixtures should load")
}

fn eval(store: &GeoliteStore, expr: &str) -> AddrSet {
    let program = filter::compile(expr).expect("fixture expression should compile");
    FilterEngine::new(store).eval(&program).expect("fixture expression should evaluate")
}

fn prefixes(set: &AddrSet) -> Vec<String> {
    set.prefixes().iter().map(|p| p.to_string()).collect()
}

#[test]
fn longest_prefix_match_selects_the_more_specific_record() {
    let store = fixture_store();
    let info = store.ip_info("31.44.8.1".parse().unwrap());

    assert_eq!(info.asn, 200351);
    assert_eq!(info.subnet.to_string(), "31.44.8.0/24");
    assert_eq!(info.org, "Yandex.Cloud LLC");
    assert_eq!(info.country_iso, "RU");
}

#[test]
fn empty_criteria_select_nothing_not_everything() {
    let store = fixture_store();
    let got = store.cidrs(&CidrQuery::default()).unwrap();
    assert!(got.is_empty());
}

#[test]
fn org_term_matching_is_case_insensitive() {
    let store = fixture_store();
    let want =
        vec!["1.179.112.0/20", "2.56.250.0/24", "34.0.128.0/19", "193.186.4.0/24"];

    assert_eq!(prefixes(&eval(&store, r#"org("google")"#)), want);
    assert_eq!(prefixes(&eval(&store, r#"org("Google")"#)), want);
}

#[test]
fn intersection_yields_a_subset_of_each_operand() {
    let store = fixture_store();

    let both = eval(&store, r#"country("ru") && org("yandex")"#);
    let ru = eval(&store, r#"country("ru")"#);
    let yandex = eval(&store, r#"org("yandex")"#);

    assert_eq!(prefixes(&both), vec!["31.44.8.0/21", "37.9.64.0/24"]);

    for range in both.ranges() {
        assert!(ru.contains(range.start_addr) && ru.contains(range.end_addr));
        assert!(yandex.contains(range.start_addr) && yandex.contains(range.end_addr));
    }
}

#[test]
fn evaluation_is_pure() {
    let store = fixture_store();
    let program = filter::compile(r#"org("yandex") || country("us")"#).unwrap();
    let engine = FilterEngine::new(&store);

    let first = engine.eval(&program).unwrap();
    let second = engine.eval(&program).unwrap();
    assert_eq!(first, second);
}
