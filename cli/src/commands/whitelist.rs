use std::time::Duration;

use dpiprobe_common::config::{NetCfg, WhitelistCfg};
use dpiprobe_common::error::WhitelistVerdict;
use dpiprobe_core::checkers::cidrwhitelist;

use crate::terminal::print;

#[derive(clap::Args)]
pub struct WhitelistArgs {
    /// Endpoint expected reachable on an unrestricted path (repeatable).
    #[arg(long = "norm", required = true)]
    pub norm_endpoints: Vec<String>,

    /// Endpoint expected reachable even under whitelist censorship
    /// (repeatable).
    #[arg(long = "wl", required = true)]
    pub wl_endpoints: Vec<String>,

    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,
}

pub async fn run(args: WhitelistArgs) -> anyhow::Result<()> {
    let cfg = WhitelistCfg {
        timeout: Duration::from_secs(args.timeout_secs),
        norm_endpoints: args.norm_endpoints,
        wl_endpoints: args.wl_endpoints,
    };

    print::header("cidr whitelist");
    let verdict = cidrwhitelist::cidr_whitelist(&cfg, &NetCfg::default()).await?;

    match verdict {
        WhitelistVerdict::NotDetected => print::ok("no cidr whitelisting detected"),
        WhitelistVerdict::Detected => {
            print::bad("cidr whitelist detected: only whitelisted endpoints answered");
        }
        WhitelistVerdict::NoInternetAccess => {
            print::attention("no endpoint answered; there seems to be no internet access");
        }
    }

    Ok(())
}
