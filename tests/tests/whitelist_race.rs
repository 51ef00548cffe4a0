//! CIDR-whitelist race priority, exercised against local listeners.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dpiprobe_common::config::{NetCfg, WhitelistCfg};
use dpiprobe_common::error::WhitelistVerdict;
use dpiprobe_core::checkers::cidrwhitelist::cidr_whitelist;

/// Minimal HTTP server answering every connection with 200; returns its URL.
async fn serve_ok() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut conn, _peer)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = conn.read(&mut buf).await;
                let _ = conn
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                    .await;
            });
        }
    });

    format!("http://{addr}/")
}

/// A url whose port was bound once and released: connecting is refused.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

fn cfg(norm: Vec<String>, wl: Vec<String>) -> WhitelistCfg {
    WhitelistCfg {
        timeout: Duration::from_secs(2),
        norm_endpoints: norm,
        wl_endpoints: wl,
    }
}

#[tokio::test]
async fn regular_success_wins_regardless_of_whitelist_outcome() {
    let norm = serve_ok().await;
    let wl = serve_ok().await;

    let verdict = cidr_whitelist(&cfg(vec![norm], vec![wl]), &NetCfg::default())
        .await
        .unwrap();
    assert_eq!(verdict, WhitelistVerdict::NotDetected);
}

#[tokio::test]
async fn regular_success_wins_even_when_whitelist_fails() {
    let norm = serve_ok().await;
    let wl = dead_url().await;

    let verdict = cidr_whitelist(&cfg(vec![norm], vec![wl]), &NetCfg::default())
        .await
        .unwrap();
    assert_eq!(verdict, WhitelistVerdict::NotDetected);
}

#[tokio::test]
async fn whitelist_only_success_is_a_detection() {
    let norm = dead_url().await;
    let wl = serve_ok().await;

    let verdict = cidr_whitelist(&cfg(vec![norm], vec![wl]), &NetCfg::default())
        .await
        .unwrap();
    assert_eq!(verdict, WhitelistVerdict::Detected);
}

#[tokio::test]
async fn zero_successes_mean_no_internet_access() {
    let norm = dead_url().await;
    let wl = dead_url().await;

    let verdict = cidr_whitelist(&cfg(vec![norm], vec![wl]), &NetCfg::default())
        .await
        .unwrap();
    assert_eq!(verdict, WhitelistVerdict::NoInternetAccess);
}

#[tokio::test]
async fn several_regular_endpoints_race_to_one_verdict() {
    let fast = serve_ok().await;
    let dead = dead_url().await;
    let wl = dead_url().await;

    let verdict = cidr_whitelist(&cfg(vec![dead, fast], vec![wl]), &NetCfg::default())
        .await
        .unwrap();
    assert_eq!(verdict, WhitelistVerdict::NotDetected);
}
