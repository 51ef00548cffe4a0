//! Who does the censor think we are: external address plus its
//! attribution from the local store.

use std::net::Ipv4Addr;

use tokio::time::timeout;

use dpiprobe_common::config::WhoamiCfg;
use dpiprobe_common::error::ProbeFailure;

use crate::intel::IntelLookup;
use crate::ripe::RipeClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoamiReport {
    pub ip: Ipv4Addr,
    pub subnet: String,
    pub asn: String,
    pub org: String,
    pub country: String,
}

pub async fn whoami(
    cfg: &WhoamiCfg,
    ripe: &RipeClient,
    intel: &dyn IntelLookup,
) -> Result<WhoamiReport, ProbeFailure> {
    let ip = timeout(cfg.timeout, ripe.external_ip())
        .await
        .map_err(|_elapsed| ProbeFailure::ConnTimeout)??;

    let info = intel.ip_info(ip);

    Ok(WhoamiReport {
        ip,
        subnet: info.subnet.to_string(),
        asn: format!("AS{}", info.asn),
        org: info.org,
        country: info.country_iso,
    })
}
