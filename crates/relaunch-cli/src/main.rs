// relaunch entry point

use clap::Parser;
use relaunch_cli::{logging, run, Cli};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(logging::resolve_level(&cli.log_level, cli.verbose, cli.quiet));

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}
