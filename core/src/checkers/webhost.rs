//! Fingerprinted-TLS liveness + signature probe.
//!
//! For every host the farm sampler produced, two independent sessions are
//! run, each over a fresh browser-fingerprinted handshake to the bare
//! address:
//!
//! 1. HEAD, then drain the response — liveness.
//! 2. POST with a random payload sized to the byte-read target, then drain —
//!    the 16-20 signature measured over a raw TLS channel instead of a
//!    named URL.
//!
//! Every failure classifies into one closed [`ProbeFailure`] kind.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use rand::Rng;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dpiprobe_common::config::WebhostCfg;
use dpiprobe_common::error;
use dpiprobe_common::error::ProbeFailure;
use dpiprobe_protocols::http::{self, RawRequest};
use dpiprobe_protocols::tls::{self, Fingerprint};

use crate::farm::FarmItem;
use crate::pool::{self, PoolOpt};

#[derive(Debug, Clone, Copy)]
pub struct WebhostJob {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl From<FarmItem> for WebhostJob {
    fn from(item: FarmItem) -> Self {
        Self { addr: item.addr, port: item.port }
    }
}

/// Per-host outcome. `None` in a session slot means that session passed.
#[derive(Debug, Clone, Copy)]
pub struct WebhostReport {
    pub addr: Ipv4Addr,
    pub port: u16,
    pub tls_version: Option<u16>,
    pub alive: Option<ProbeFailure>,
    pub tcp1620: Option<ProbeFailure>,
}

/// Runs the probe over the sampled hosts through the worker pool.
pub fn start(
    cancel: CancellationToken,
    cfg: WebhostCfg,
    items: Vec<FarmItem>,
) -> mpsc::Receiver<WebhostReport> {
    let tls_config = match Fingerprint::Chrome.client_config() {
        Ok(config) => config,
        Err(err) => {
            error!("webhost tls config: {err}");
            let (tx, rx) = mpsc::channel(1);
            drop(tx);
            return rx;
        }
    };

    let jobs: Vec<WebhostJob> = items.into_iter().map(WebhostJob::from).collect();
    let (job_tx, job_rx) = mpsc::channel(1);
    tokio::spawn(pool::push_and_close(cancel.clone(), job_tx, jobs));

    let cfg = Arc::new(cfg);

    pool::start(
        PoolOpt { workers: cfg.check_workers, cancel },
        job_rx,
        move |job| {
            let cfg = Arc::clone(&cfg);
            let tls_config = Arc::clone(&tls_config);
            async move { single(&cfg, tls_config, job).await }
        },
    )
}

/// Both sessions for one host. The signature session only runs once the
/// liveness session passed; a host that never came up stays unprobed.
pub async fn single(
    cfg: &WebhostCfg,
    tls_config: Arc<ClientConfig>,
    job: WebhostJob,
) -> WebhostReport {
    let mut report = WebhostReport {
        addr: job.addr,
        port: job.port,
        tls_version: None,
        alive: None,
        tcp1620: None,
    };

    // liveness session
    match open_session(cfg, Arc::clone(&tls_config), &job).await {
        Err(kind) => {
            report.alive = Some(kind);
            return report;
        }
        Ok(mut conn) => {
            report.tls_version = tls::protocol_version(&conn).map(u16::from);
            report.alive = head_session(cfg, &mut conn).await.err();
            if report.alive.is_some() {
                return report;
            }
        }
    }

    // signature session over a fresh handshake
    match open_session(cfg, tls_config, &job).await {
        Err(kind) => report.tcp1620 = Some(kind),
        Ok(mut conn) => {
            report.tcp1620 = post_session(cfg, &mut conn).await.err();
        }
    }

    report
}

async fn open_session(
    cfg: &WebhostCfg,
    tls_config: Arc<ClientConfig>,
    job: &WebhostJob,
) -> Result<TlsStream<TcpStream>, ProbeFailure> {
    let sock = SocketAddr::from((job.addr, job.port));

    let stream = match timeout(cfg.tcp_conn_timeout, TcpStream::connect(sock)).await {
        Err(_elapsed) => return Err(ProbeFailure::ConnTimeout),
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::TimedOut => {
            return Err(ProbeFailure::ConnTimeout);
        }
        Ok(Err(err)) => {
            debug!("webhost dial {sock}: {err}");
            return Err(ProbeFailure::Internal);
        }
        Ok(Ok(stream)) => stream,
    };

    tls::handshake(stream, IpAddr::V4(job.addr), tls_config, cfg.tls_handshake_timeout).await
}

async fn head_session(
    cfg: &WebhostCfg,
    conn: &mut TlsStream<TcpStream>,
) -> Result<(), ProbeFailure> {
    let request = http::serialize_request(&RawRequest {
        method: "HEAD",
        host: None,
        headers: &cfg.http_static_headers,
        body: None,
    });

    http::write_all(conn, &request, cfg.tcp_write_timeout).await?;
    http::read_to_end(conn, cfg.tcp_read_timeout).await.map(drop)
}

async fn post_session(
    cfg: &WebhostCfg,
    conn: &mut TlsStream<TcpStream>,
) -> Result<(), ProbeFailure> {
    let body = random_payload(cfg.tcp1620_n_bytes);
    let request = http::serialize_request(&RawRequest {
        method: "POST",
        host: None,
        headers: &cfg.http_static_headers,
        body: Some(&body),
    });

    http::write_all(conn, &request, cfg.tcp_write_timeout).await?;
    http::read_to_end(conn, cfg.tcp_read_timeout).await.map(drop)
}

fn random_payload(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::rng().fill(buf.as_mut_slice());
    buf
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
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn random_payload_has_requested_size_and_entropy() {
        let a = random_payload(1024);
        let b = random_payload(1024);
        assert_eq!(a.len(), 1024);
        assert_ne!(a, b, "two payloads should practically never collide");
    }

    #[tokio::test]
    async fn unreachable_host_classifies_without_probing_twice() {
        // TEST-NET-1 never answers; both session slots must stay on the
        // liveness failure, the signature session is never attempted.
        let cfg = WebhostCfg {
            tcp_conn_timeout: Duration::from_millis(50),
            ..WebhostCfg::default()
        };
        let tls_config = Fingerprint::Chrome.client_config().unwrap();
        let job = WebhostJob { addr: "192.0.2.1".parse().unwrap(), port: 443 };

        let report = single(&cfg, tls_config, job).await;
        assert!(report.alive.is_some());
        assert!(report.tcp1620.is_none());
        assert_eq!(report.tls_version, None);
    }
}
