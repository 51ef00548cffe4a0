use anyhow::anyhow;

use dpiprobe_common::config::{NetCfg, WhoamiCfg};
use dpiprobe_core::checkers::whoami;
use dpiprobe_core::ripe::RipeClient;

use crate::commands::DatasetArgs;
use crate::terminal::print;

pub async fn run(datasets: &DatasetArgs) -> anyhow::Result<()> {
    let store = datasets.load()?;
    let ripe = RipeClient::new(NetCfg::default())
        .map_err(|err| anyhow!("lookup client: {err}"))?;

    print::header("whoami");
    let report = whoami::whoami(&WhoamiCfg::default(), &ripe, &store).await?;

    print::kv("ip", &report.ip.to_string());
    print::kv("subnet", &report.subnet);
    print::kv("asn", &report.asn);
    print::kv("org", &report.org);
    print::kv("country", &report.country);

    Ok(())
}
