//! CIDR-whitelist race.
//!
//! Two endpoint lists run concurrently under their own deadlines: "regular"
//! endpoints expected reachable on an open path, and "whitelisted"
//! endpoints expected reachable even under whitelist censorship. The race
//! has an explicit priority: the instant any regular endpoint answers, both
//! lists are cancelled and the verdict is final, whatever the whitelisted
//! probes were about to report.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dpiprobe_common::config::{NetCfg, WhitelistCfg};
use dpiprobe_common::error::{ProbeFailure, WhitelistVerdict};

pub async fn cidr_whitelist(
    cfg: &WhitelistCfg,
    net: &NetCfg,
) -> Result<WhitelistVerdict, ProbeFailure> {
    let client = reqwest::Client::builder().build().map_err(|err| {
        debug!("whitelist client: {err}");
        ProbeFailure::Internal
    })?;

    let norm_count = Arc::new(AtomicU32::new(0));
    let wl_count = Arc::new(AtomicU32::new(0));
    let norm_cancel = CancellationToken::new();
    let wl_cancel = CancellationToken::new();

    let mut probes = JoinSet::new();

    for url in &cfg.norm_endpoints {
        let client = client.clone();
        let headers = net.browser_headers.clone();
        let url = url.clone();
        let deadline = cfg.timeout;
        let count = Arc::clone(&norm_count);
        let cancel = norm_cancel.clone();
        let other = wl_cancel.clone();

        probes.spawn(async move {
            if head_wins(&client, &headers, &url, deadline, &cancel).await {
                // Increments may race the cancellation that ends the run;
                // the counter is what survives.
                count.fetch_add(1, Ordering::Relaxed);
                cancel.cancel();
                other.cancel(); // the verdict is already decided
            }
        });
    }

    for url in &cfg.wl_endpoints {
        let client = client.clone();
        let headers = net.browser_headers.clone();
        let url = url.clone();
        let deadline = cfg.timeout;
        let count = Arc::clone(&wl_count);
        let cancel = wl_cancel.clone();

        probes.spawn(async move {
            if head_wins(&client, &headers, &url, deadline, &cancel).await {
                count.fetch_add(1, Ordering::Relaxed);
                cancel.cancel();
            }
        });
    }

    while probes.join_next().await.is_some() {}

    // resources outside the whitelist answered
    if norm_count.load(Ordering::Relaxed) > 0 {
        return Ok(WhitelistVerdict::NotDetected);
    }

    // ONLY whitelisted resources answered
    if wl_count.load(Ordering::Relaxed) > 0 {
        return Ok(WhitelistVerdict::Detected);
    }

    Ok(WhitelistVerdict::NoInternetAccess)
}

/// One HEAD probe racing its list's cancellation. Any response at all
/// counts as reachable.
async fn head_wins(
    client: &reqwest::Client,
    headers: &[(String, String)],
    url: &str,
    deadline: Duration,
    cancel: &CancellationToken,
) -> bool {
    let request = async {
        let mut req = client.head(url).timeout(deadline);
        for (name, value) in headers {
            req = req.header(name, value);
        }
        req.send().await.is_ok()
    };

    tokio::select! {
        _ = cancel.cancelled() => false,
        reachable = request => reachable,
    }
}
