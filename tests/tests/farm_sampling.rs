//! Sampler containment and termination bounds.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use dpiprobe_common::config::FarmCfg;
use dpiprobe_common::net::set::{AddrSet, AddrSetBuilder};
use dpiprobe_core::farm;

fn sample_set() -> AddrSet {
    let mut b = AddrSetBuilder::new();
    b.add_prefix("192.168.0.0/16".parse().unwrap());
    b.add_prefix("192.169.1.0/24".parse().unwrap());
    b.build()
}

#[test]
fn every_draw_is_contained_in_the_input_set() {
    let set = sample_set();
    for _ in 0..512 {
        let addr = farm::random_addr(&set).expect("population is non-empty");
        assert!(set.contains(addr), "{addr} drawn from outside the set");
    }
}

#[test]
fn draws_reach_both_ranges_eventually() {
    let set = sample_set();
    let mut saw_second_range = false;
    for _ in 0..20_000 {
        let addr = farm::random_addr(&set).unwrap();
        if addr >= "192.169.1.0".parse::<Ipv4Addr>().unwrap() {
            saw_second_range = true;
            break;
        }
    }
    // ~1/257 of the population per draw; 20k draws miss it with
    // probability well under 1e-30
    assert!(saw_second_range, "weighted draw never left the first range");
}

#[tokio::test]
async fn unreachable_population_terminates_at_the_attempt_cap() {
    let mut b = AddrSetBuilder::new();
    b.add_prefix("192.0.2.0/24".parse().unwrap()); // TEST-NET-1
    let set = b.build();

    let cfg = FarmCfg {
        count: 1,
        max_attempts: 4,
        tcp_conn_timeout: Duration::from_millis(100),
        deadline: Duration::from_secs(30),
        ..FarmCfg::default()
    };

    let started = Instant::now();
    let items = farm::farm(&set, &cfg).await;

    assert!(items.is_empty());
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "attempt cap should end the run quickly"
    );
}

#[tokio::test]
async fn deadline_bounds_the_run_before_the_attempt_cap() {
    let mut b = AddrSetBuilder::new();
    b.add_prefix("192.0.2.0/24".parse().unwrap());
    let set = b.build();

    let cfg = FarmCfg {
        count: 1,
        max_attempts: usize::MAX,
        tcp_conn_timeout: Duration::from_millis(100),
        deadline: Duration::from_millis(300),
        ..FarmCfg::default()
    };

    let started = Instant::now();
    let items = farm::farm(&set, &cfg).await;

    assert!(items.is_empty());
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "deadline should end the run even with attempts left"
    );
}
