//! # Host Farm Sampler
//!
//! Discovers live web hosts inside an address set without enumerating it:
//! draw a uniform random index over the set's population, map it to a
//! concrete address through a cumulative-weight scan of the ranges, and
//! keep the address only when a TCP connect followed by a
//! browser-fingerprinted TLS handshake both succeed.
//!
//! Draws are independent, so the same address can be probed twice. The run
//! stops at the requested host count, at the attempt cap, or at the
//! wall-clock deadline, whichever comes first.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio::time::timeout;

use dpiprobe_common::config::FarmCfg;
use dpiprobe_common::net::set::AddrSet;
use dpiprobe_common::{error, info, warn};
use dpiprobe_protocols::tls::{self, Fingerprint};

/// One live host found by sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmItem {
    pub addr: Ipv4Addr,
    pub port: u16,
}

/// Samples `subnets` until `cfg.count` hosts answered a fingerprinted
/// handshake. Returns what was found when a bound is hit first.
pub async fn farm(subnets: &AddrSet, cfg: &FarmCfg) -> Vec<FarmItem> {
    let total = subnets.addr_count();
    if total == 0 || cfg.count == 0 {
        return Vec::new();
    }

    let tls_config = match Fingerprint::Chrome.client_config() {
        Ok(config) => config,
        Err(err) => {
            error!("farm tls config: {err}");
            return Vec::new();
        }
    };

    let started = Instant::now();
    let mut items = Vec::new();
    let mut attempts = 0usize;

    while items.len() < cfg.count
        && attempts < cfg.max_attempts
        && started.elapsed() < cfg.deadline
    {
        attempts += 1;

        let Some(addr) = random_addr(subnets) else { break };
        if try_handshake(addr, cfg, Arc::clone(&tls_config)).await {
            items.push(FarmItem { addr, port: cfg.port });
        }
    }

    if items.len() < cfg.count {
        warn!(
            "farm found {}/{} hosts after {} attempts",
            items.len(),
            cfg.count,
            attempts
        );
    } else {
        info!("farm found {} hosts in {} attempts", items.len(), attempts);
    }

    items
}

/// One uniform draw over the set's population.
pub fn random_addr(subnets: &AddrSet) -> Option<Ipv4Addr> {
    let total = subnets.addr_count();
    if total == 0 {
        return None;
    }
    locate(subnets, rand::random_range(0..total))
}

/// Maps a population index to an address by walking the ranges in
/// cumulative-weight order.
pub fn locate(subnets: &AddrSet, mut index: u64) -> Option<Ipv4Addr> {
    for range in subnets.ranges() {
        let weight = range.len();
        if index < weight {
            return range.nth(index);
        }
        index -= weight;
    }
    None
}

/// Connect, then handshake without SNI or verification. Liveness is the
/// handshake completing; nothing is written to the host.
async fn try_handshake(addr: Ipv4Addr, cfg: &FarmCfg, tls_config: Arc<ClientConfig>) -> bool {
    let sock = SocketAddr::from((addr, cfg.port));
    let stream = match timeout(cfg.tcp_conn_timeout, TcpStream::connect(sock)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(_)) | Err(_) => return false,
    };

    tls::handshake(stream, IpAddr::V4(addr), tls_config, cfg.tls_handshake_timeout)
        .await
        .is_ok()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
