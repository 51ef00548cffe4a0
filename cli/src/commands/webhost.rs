use colored::*;
use tokio_util::sync::CancellationToken;

use dpiprobe_common::config::{FarmCfg, WebhostCfg};
use dpiprobe_common::error::ProbeFailure;
use dpiprobe_common::info;
use dpiprobe_core::checkers::webhost::{self, WebhostReport};
use dpiprobe_core::farm;
use dpiprobe_core::filter::{self, FilterEngine};

use crate::commands::DatasetArgs;
use crate::terminal::{print, spinner};

#[derive(clap::Args)]
pub struct WebhostArgs {
    /// Subnet filter expression selecting the population to sample,
    /// e.g. `org("hetzner")`.
    #[arg(long)]
    pub filter: String,

    /// Live hosts to find before probing starts.
    #[arg(long, default_value_t = 2)]
    pub count: usize,

    #[arg(long, default_value_t = 443)]
    pub port: u16,
}

pub async fn run(datasets: &DatasetArgs, args: WebhostArgs) -> anyhow::Result<()> {
    let store = datasets.load()?;

    let program = filter::compile(&args.filter)?;
    let subnets = FilterEngine::new(&store).eval(&program)?;
    info!(
        "filter selected {} prefixes covering {} addresses",
        subnets.prefixes().len(),
        subnets.addr_count()
    );

    let farm_cfg = FarmCfg { count: args.count, port: args.port, ..FarmCfg::default() };

    let progress = spinner::start("sampling live hosts");
    let items = farm::farm(&subnets, &farm_cfg).await;
    progress.finish_and_clear();

    if items.is_empty() {
        print::attention("no live hosts found in the selected population");
        return Ok(());
    }

    print::header("webhost");

    let cancel = CancellationToken::new();
    let mut results = webhost::start(cancel, WebhostCfg::default(), items);

    while let Some(report) = results.recv().await {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &WebhostReport) {
    let target = format!("{}:{}", report.addr, report.port).bold();
    let version = match report.tls_version {
        Some(0x0304) => "tls1.3",
        Some(0x0303) => "tls1.2",
        Some(_) => "tls?",
        None => "-",
    };

    println!(
        "  {target} {} alive: {} / 16-20: {}",
        version.dimmed(),
        session(report.alive),
        session(report.tcp1620),
    );
}

fn session(outcome: Option<ProbeFailure>) -> ColoredString {
    match outcome {
        None => "ok".green().bold(),
        Some(kind) => kind.to_string().red(),
    }
}
