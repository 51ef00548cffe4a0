use dpiprobe_common::success;
use dpiprobe_core::filter::{self, FilterEngine};

use crate::commands::DatasetArgs;
use crate::terminal::print;

#[derive(clap::Args)]
pub struct FilterArgs {
    /// Expression over host/subnet/as/org/country, e.g.
    /// `org("yandex") && country("ru")`.
    pub expr: String,
}

pub async fn run(datasets: &DatasetArgs, args: FilterArgs) -> anyhow::Result<()> {
    let store = datasets.load()?;

    let program = filter::compile(&args.expr)?;
    let subnets = FilterEngine::new(&store).eval(&program)?;

    print::header("filter");
    for prefix in subnets.prefixes() {
        println!("  {prefix}");
    }
    success!(
        "{} prefixes, {} addresses",
        subnets.prefixes().len(),
        subnets.addr_count()
    );

    Ok(())
}
