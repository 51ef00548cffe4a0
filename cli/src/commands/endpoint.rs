use dpiprobe_common::config::{EndpointCfg, NetCfg};
use dpiprobe_core::checkers::endpoint;

use crate::terminal::print;

#[derive(clap::Args)]
pub struct EndpointArgs {
    /// URL to check.
    pub url: String,
}

pub async fn run(args: EndpointArgs) -> anyhow::Result<()> {
    print::header("endpoint");

    match endpoint::check(&args.url, &EndpointCfg::default(), &NetCfg::default()).await {
        Ok(()) => print::ok(&format!("{} is available", args.url)),
        Err(err) => print::bad(&format!("{} failed: {err}", args.url)),
    }

    Ok(())
}
