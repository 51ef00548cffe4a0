mod commands;
mod terminal;

use commands::{CommandLine, Commands, endpoint, filter, tcp1620, webhost, whitelist, whoami};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    terminal::logging::init(cli.verbose);

    match cli.command {
        Commands::Whitelist(args) => whitelist::run(args).await,
        Commands::Tcp1620(args) => tcp1620::run(&cli.datasets, args).await,
        Commands::Webhost(args) => webhost::run(&cli.datasets, args).await,
        Commands::Whoami => whoami::run(&cli.datasets).await,
        Commands::Endpoint(args) => endpoint::run(args).await,
        Commands::Filter(args) => filter::run(&cli.datasets, args).await,
    }
}
