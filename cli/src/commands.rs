pub mod endpoint;
pub mod filter;
pub mod tcp1620;
pub mod webhost;
pub mod whitelist;
pub mod whoami;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use dpiprobe_core::intel::{GeoliteOpt, GeoliteStore};

#[derive(Parser)]
#[command(name = "dpiprobe", about = "Network censorship measurement probes", version)]
pub struct CommandLine {
    #[command(flatten)]
    pub datasets: DatasetArgs,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Paths of the attribution datasets; only store-backed commands read them.
#[derive(Args)]
pub struct DatasetArgs {
    /// `cidr,asn,organization` dataset (GeoLite2 ASN CSV layout).
    #[arg(long, global = true, default_value = "data/cidr2as_ipv4.csv")]
    pub asn_csv: PathBuf,

    /// `cidr,geoname-ids` dataset (GeoLite2 country CSV layout).
    #[arg(long, global = true, default_value = "data/cidr2country_ipv4.csv")]
    pub country_csv: PathBuf,

    /// `geoname-id,..,iso-code` join table.
    #[arg(long, global = true, default_value = "data/locations_en.csv")]
    pub locations_csv: PathBuf,
}

impl DatasetArgs {
    pub fn load(&self) -> anyhow::Result<GeoliteStore> {
        let store = GeoliteStore::load(&GeoliteOpt {
            asn_path: self.asn_csv.clone(),
            country_path: self.country_csv.clone(),
            locations_path: self.locations_csv.clone(),
        })?;
        Ok(store)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Race regular endpoints against whitelisted ones.
    Whitelist(whitelist::WhitelistArgs),
    /// Byte-read signature probe over named endpoints.
    Tcp1620(tcp1620::Tcp1620Args),
    /// Fingerprinted-TLS probe over hosts sampled from a filter expression.
    Webhost(webhost::WebhostArgs),
    /// Attribute the current external address.
    Whoami,
    /// Plain availability check of one endpoint.
    Endpoint(endpoint::EndpointArgs),
    /// Evaluate a subnet filter expression and print the selected prefixes.
    Filter(filter::FilterArgs),
}
