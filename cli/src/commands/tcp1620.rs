use std::sync::Arc;

use colored::*;
use tokio_util::sync::CancellationToken;

use dpiprobe_common::config::{NetCfg, Tcp1620Cfg};
use dpiprobe_common::error::Tcp1620Verdict;
use dpiprobe_core::checkers::tcp1620::{self, Tcp1620Report};

use crate::commands::DatasetArgs;
use crate::terminal::print;

#[derive(clap::Args)]
pub struct Tcp1620Args {
    /// Endpoint URLs to probe.
    #[arg(required = true)]
    pub endpoints: Vec<String>,

    #[arg(long, default_value_t = 4)]
    pub workers: usize,
}

pub async fn run(datasets: &DatasetArgs, args: Tcp1620Args) -> anyhow::Result<()> {
    let store = Arc::new(datasets.load()?);

    let cfg = Tcp1620Cfg {
        workers: args.workers,
        endpoints: args.endpoints,
        ..Tcp1620Cfg::default()
    };

    print::header("tcp 16-20");

    let cancel = CancellationToken::new();
    let mut results = tcp1620::start(cancel, cfg, NetCfg::default(), store);

    while let Some(report) = results.recv().await {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &Tcp1620Report) {
    let attrs = &report.attrs;
    let who = if attrs.id.is_empty() { attrs.url.as_str() } else { attrs.id.as_str() };
    let flag = if attrs.country_flag.is_empty() { "" } else { attrs.country_flag.as_str() };

    let verdict: ColoredString = match report.verdict {
        Tcp1620Verdict::Clean => "clean".green().bold(),
        Tcp1620Verdict::ConnectionError => "connection error".red(),
        Tcp1620Verdict::ReadError => "16-20 signature".red().bold(),
    };

    println!("  {flag} {} {} {}", who.bold(), attrs.org.dimmed(), verdict);
}
