//! Plain availability check of a single web resource.

use tracing::debug;

use dpiprobe_common::config::{EndpointCfg, NetCfg};
use dpiprobe_common::error::ProbeFailure;

/// GET with browser headers under the configured timeout; the body must
/// arrive in full for the endpoint to count as available.
pub async fn check(url: &str, cfg: &EndpointCfg, net: &NetCfg) -> Result<(), ProbeFailure> {
    let client = reqwest::Client::builder()
        .timeout(cfg.timeout)
        .build()
        .map_err(|err| {
            debug!("endpoint client: {err}");
            ProbeFailure::Internal
        })?;

    let mut req = client.get(url);
    for (name, value) in &net.browser_headers {
        req = req.header(name, value);
    }

    let resp = req.send().await.map_err(|_| ProbeFailure::ConnectionError)?;
    resp.bytes().await.map(drop).map_err(|_| ProbeFailure::ConnectionError)
}
