//! Resolved configuration values.
//!
//! Parsing and validation of user-facing configuration happen outside this
//! workspace; checkers receive these structs with every value already
//! resolved. The `Default` impls mirror the thresholds the measurement
//! method was calibrated with (24 KiB byte target, 5 s deadlines).

use std::time::Duration;

/// Settings shared by every HTTP/lookup client.
#[derive(Debug, Clone)]
pub struct NetCfg {
    pub ripe_api_url: String,
    /// Plain-text external-IP endpoint used when the RIPE API is unreachable.
    pub fallback_ip_url: String,
    pub timeout: Duration,
    /// Header set making plain HTTP requests look like a mainstream browser.
    pub browser_headers: Vec<(String, String)>,
}

impl Default for NetCfg {
    fn default() -> Self {
        Self {
            ripe_api_url: "https://stat.ripe.net/data/".into(),
            fallback_ip_url: "https://api.ipify.org".into(),
            timeout: Duration::from_secs(5),
            browser_headers: default_browser_headers(),
        }
    }
}

fn default_browser_headers() -> Vec<(String, String)> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        ),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// CIDR-whitelist race: two endpoint lists, one deadline each.
#[derive(Debug, Clone)]
pub struct WhitelistCfg {
    pub timeout: Duration,
    /// Expected reachable even under whitelist censorship.
    pub wl_endpoints: Vec<String>,
    /// Expected reachable on an unrestricted path.
    pub norm_endpoints: Vec<String>,
}

impl Default for WhitelistCfg {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            wl_endpoints: Vec::new(),
            norm_endpoints: Vec::new(),
        }
    }
}

/// Byte-read signature probe over named endpoints.
#[derive(Debug, Clone)]
pub struct Tcp1620Cfg {
    pub workers: usize,
    /// Bytes that must arrive for an endpoint to be considered clean. Sits
    /// above the 16-20 KiB window the signature fires in.
    pub n_bytes: usize,
    pub tcp_conn_timeout: Duration,
    pub http_headers_timeout: Duration,
    pub total_timeout: Duration,
    pub endpoints: Vec<String>,
}

impl Default for Tcp1620Cfg {
    fn default() -> Self {
        Self {
            workers: 4,
            n_bytes: 24 * 1024,
            tcp_conn_timeout: Duration::from_secs(5),
            http_headers_timeout: Duration::from_secs(5),
            total_timeout: Duration::from_secs(15),
            endpoints: Vec::new(),
        }
    }
}

/// Fingerprinted-TLS probe against sampled hosts.
#[derive(Debug, Clone)]
pub struct WebhostCfg {
    pub check_workers: usize,
    pub tcp_conn_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    pub tcp_read_timeout: Duration,
    pub tcp_write_timeout: Duration,
    /// Size of the random POST payload; reproduces the byte-read target.
    pub tcp1620_n_bytes: usize,
    /// Static header lines written into the raw HTTP/1.1 requests.
    pub http_static_headers: Vec<(String, String)>,
}

impl Default for WebhostCfg {
    fn default() -> Self {
        Self {
            check_workers: 4,
            tcp_conn_timeout: Duration::from_secs(5),
            tls_handshake_timeout: Duration::from_secs(5),
            tcp_read_timeout: Duration::from_secs(10),
            tcp_write_timeout: Duration::from_secs(10),
            tcp1620_n_bytes: 24 * 1024,
            http_static_headers: default_browser_headers(),
        }
    }
}

/// Host farm sampling bounds.
#[derive(Debug, Clone)]
pub struct FarmCfg {
    pub port: u16,
    pub count: usize,
    pub tcp_conn_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    /// Hard cap on random draws; sampling stops here even if fewer than
    /// `count` hosts were found.
    pub max_attempts: usize,
    /// Wall-clock bound for the whole sampling run.
    pub deadline: Duration,
}

impl Default for FarmCfg {
    fn default() -> Self {
        Self {
            port: 443,
            count: 2,
            tcp_conn_timeout: Duration::from_secs(2),
            tls_handshake_timeout: Duration::from_secs(3),
            max_attempts: 2048,
            deadline: Duration::from_secs(60),
        }
    }
}

/// Single-endpoint availability check.
#[derive(Debug, Clone)]
pub struct EndpointCfg {
    pub timeout: Duration,
}

impl Default for EndpointCfg {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(5) }
    }
}

/// External-IP attribution check.
#[derive(Debug, Clone)]
pub struct WhoamiCfg {
    pub timeout: Duration,
}

impl Default for WhoamiCfg {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(5) }
    }
}
