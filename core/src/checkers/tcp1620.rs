//! Byte-read signature probe ("16-20").
//!
//! Some censors let a TCP/TLS flow come up and then reset it after a short
//! prefix of payload bytes. Per endpoint: resolve and attribute the host,
//! open an HTTP(S) connection pinned to the resolved address with
//! compression, keep-alive and redirects disabled, and count body bytes
//! toward a target that sits above the signature window. Dying mid-read is
//! the signature; failing to connect is its own class.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dpiprobe_common::config::{NetCfg, Tcp1620Cfg};
use dpiprobe_common::error::Tcp1620Verdict;

use crate::checkers::attrs::{EndpointAttrs, endpoint_attrs};
use crate::intel::IntelLookup;
use crate::pool::{self, PoolOpt};

/// One endpoint to probe. `resolve` pins the connection to a caller-chosen
/// address instead of the resolver's answer.
#[derive(Debug, Clone)]
pub struct Tcp1620Job {
    pub url: String,
    pub resolve: Option<Ipv4Addr>,
}

#[derive(Debug, Clone)]
pub struct Tcp1620Report {
    pub attrs: EndpointAttrs,
    pub verdict: Tcp1620Verdict,
}

/// Probes every configured endpoint through the worker pool; results
/// arrive on the returned stream in completion order.
pub fn start(
    cancel: CancellationToken,
    cfg: Tcp1620Cfg,
    net: NetCfg,
    intel: Arc<dyn IntelLookup>,
) -> mpsc::Receiver<Tcp1620Report> {
    let jobs: Vec<Tcp1620Job> = cfg
        .endpoints
        .iter()
        .map(|url| Tcp1620Job { url: url.clone(), resolve: None })
        .collect();

    let (job_tx, job_rx) = mpsc::channel(1);
    tokio::spawn(pool::push_and_close(cancel.clone(), job_tx, jobs));

    let cfg = Arc::new(cfg);
    let net = Arc::new(net);

    pool::start(
        PoolOpt { workers: cfg.workers, cancel },
        job_rx,
        move |job| {
            let cfg = Arc::clone(&cfg);
            let net = Arc::clone(&net);
            let intel = Arc::clone(&intel);
            async move { single(&cfg, &net, intel.as_ref(), job).await }
        },
    )
}

/// One endpoint, one classification.
pub async fn single(
    cfg: &Tcp1620Cfg,
    net: &NetCfg,
    intel: &dyn IntelLookup,
    job: Tcp1620Job,
) -> Tcp1620Report {
    let attrs = match endpoint_attrs(&job.url, intel).await {
        Ok(attrs) => attrs,
        Err(err) => {
            debug!("{}: attribution failed: {err}", job.url);
            let attrs = EndpointAttrs { url: job.url, ..EndpointAttrs::default() };
            return Tcp1620Report { attrs, verdict: Tcp1620Verdict::ConnectionError };
        }
    };

    let verdict = probe(cfg, net, &attrs, job.resolve).await;
    Tcp1620Report { attrs, verdict }
}

async fn probe(
    cfg: &Tcp1620Cfg,
    net: &NetCfg,
    attrs: &EndpointAttrs,
    resolve: Option<Ipv4Addr>,
) -> Tcp1620Verdict {
    // The connection must go to the address the attributes describe, not
    // to whatever a second resolution returns.
    let pin = resolve.or(attrs.ip_addr);

    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .connect_timeout(cfg.tcp_conn_timeout)
        .read_timeout(cfg.http_headers_timeout)
        .timeout(cfg.total_timeout)
        .danger_accept_invalid_certs(true);
    if let Some(ip) = pin {
        builder = builder.resolve(&attrs.host, SocketAddr::from((ip, 0)));
    }
    let client = match builder.build() {
        Ok(client) => client,
        Err(err) => {
            debug!("probe client: {err}");
            return Tcp1620Verdict::ConnectionError;
        }
    };

    let mut req = client.get(&attrs.url);
    for (name, value) in &net.browser_headers {
        req = req.header(name, value);
    }

    let mut resp = match req.send().await {
        Ok(resp) => resp,
        Err(_) => return Tcp1620Verdict::ConnectionError,
    };

    let mut read = 0usize;
    while read < cfg.n_bytes {
        match resp.chunk().await {
            Ok(Some(chunk)) => read += chunk.len(),
            // EOF or a mid-stream failure before the target count: the flow
            // was cut after its initial burst.
            Ok(None) | Err(_) => return Tcp1620Verdict::ReadError,
        }
    }

    Tcp1620Verdict::Clean
}
