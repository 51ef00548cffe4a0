//! RIPEstat client: external IP, prefix/ASN overview, geo location.
//!
//! The JSON shapes are the documented nested forms of the RIPEstat data
//! API. Anything that does not deserialize maps to
//! [`ProbeFailure::Internal`] so the error surface stays closed; transport
//! problems classify as connection failures.

use std::net::Ipv4Addr;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use dpiprobe_common::config::NetCfg;
use dpiprobe_common::error::ProbeFailure;

/// Attribution of an address as the external API sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsOverview {
    pub asn: String,
    pub holder: String,
    pub subnet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
}

#[derive(Deserialize)]
struct WhatsMyIp {
    data: WhatsMyIpData,
}

#[derive(Deserialize)]
struct WhatsMyIpData {
    ip: String,
}

#[derive(Deserialize)]
struct PrefixOverview {
    data: PrefixOverviewData,
}

#[derive(Deserialize)]
struct PrefixOverviewData {
    #[serde(default)]
    asns: Vec<AsnEntry>,
    #[serde(default)]
    resource: String,
}

#[derive(Deserialize)]
struct AsnEntry {
    asn: u32,
    holder: String,
}

#[derive(Deserialize)]
struct MaxmindGeo {
    data: MaxmindGeoData,
}

#[derive(Deserialize)]
struct MaxmindGeoData {
    #[serde(default)]
    located_resources: Vec<LocatedResource>,
}

#[derive(Deserialize)]
struct LocatedResource {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Deserialize, Default)]
struct Location {
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: String,
}

pub struct RipeClient {
    http: reqwest::Client,
    cfg: NetCfg,
}

impl RipeClient {
    pub fn new(cfg: NetCfg) -> Result<Self, ProbeFailure> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|err| {
                debug!("ripe client: {err}");
                ProbeFailure::Internal
            })?;
        Ok(Self { http, cfg })
    }

    /// The caller's external address: RIPEstat first, then the plain-text
    /// fallback endpoint.
    pub async fn external_ip(&self) -> Result<Ipv4Addr, ProbeFailure> {
        let url = format!("{}whats-my-ip/data.json", self.cfg.ripe_api_url);
        match self.get_json::<WhatsMyIp>(&url).await {
            Ok(raw) => raw.data.ip.parse().map_err(|_| ProbeFailure::Internal),
            Err(_) => self.external_ip_fallback().await,
        }
    }

    async fn external_ip_fallback(&self) -> Result<Ipv4Addr, ProbeFailure> {
        let body = self
            .get(&self.cfg.fallback_ip_url)
            .await?
            .text()
            .await
            .map_err(|_| ProbeFailure::Internal)?;
        body.trim().parse().map_err(|_| ProbeFailure::Internal)
    }

    pub async fn as_overview(&self, ip: Ipv4Addr) -> Result<AsOverview, ProbeFailure> {
        let url = format!(
            "{}prefix-overview/data.json?resource={ip}",
            self.cfg.ripe_api_url
        );
        let raw = self.get_json::<PrefixOverview>(&url).await?;

        let mut overview = AsOverview {
            asn: String::new(),
            holder: String::new(),
            subnet: raw.data.resource,
        };
        if let Some(first) = raw.data.asns.first() {
            overview.asn = first.asn.to_string();
            // Holders arrive as "SLUG - Human Name"; keep the name part.
            overview.holder = first
                .holder
                .split(" - ")
                .last()
                .unwrap_or_default()
                .to_string();
        }
        Ok(overview)
    }

    pub async fn geo_location(&self, ip: Ipv4Addr) -> Result<GeoLocation, ProbeFailure> {
        let url = format!(
            "{}maxmind-geo-lite/data.json?resource={ip}",
            self.cfg.ripe_api_url
        );
        let raw = self.get_json::<MaxmindGeo>(&url).await?;

        let first = raw
            .data
            .located_resources
            .into_iter()
            .next()
            .and_then(|r| r.locations.into_iter().next())
            .unwrap_or_default();

        Ok(GeoLocation {
            country: first.country,
            city: if first.city.is_empty() { "-".into() } else { first.city },
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProbeFailure> {
        let mut req = self.http.get(url);
        for (name, value) in &self.cfg.browser_headers {
            req = req.header(name, value);
        }
        req.send().await.map_err(classify_transport)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProbeFailure> {
        let resp = self.get(url).await?;
        resp.json::<T>().await.map_err(|err| {
            debug!("unexpected api response shape: {err}");
            ProbeFailure::Internal
        })
    }
}

fn classify_transport(err: reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::ConnTimeout
    } else if err.is_connect() {
        ProbeFailure::ConnectionError
    } else {
        debug!("api transport: {err}");
        ProbeFailure::Internal
    }
}
