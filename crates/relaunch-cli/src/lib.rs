//! # relaunch
//!
//! Command-line front end for `relaunch-supervisor`: reads build events from
//! stdin and keeps one fresh instance of the given command running.
//!
//! ```text
//! relaunch [--port N | --no-debug-port] [--title T] [--config FILE] [--start] -- <command> [args...]
//! ```

pub mod cli;
pub mod events;
pub mod logging;
pub mod settings;

use anyhow::{Context, Result};
use relaunch_supervisor::{shutdown_exit_code, BuildEvent, BuildHook, Supervisor, SupervisorHook};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info};

pub use cli::Cli;

/// Run until stdin closes, returning the host exit code
pub async fn run(cli: Cli) -> Result<i32> {
    let options = settings::load(&cli)?;
    debug!(?options, "Loaded options");

    let supervisor = Supervisor::builder(options)
        .build()
        .context("starting supervisor")?;

    if cli.start {
        SupervisorHook::new(supervisor.clone())
            .on_build(BuildEvent::Succeeded)
            .await;
    }

    drive(&supervisor, BufReader::new(tokio::io::stdin())).await
}

/// Restart `supervisor` for every build event in `input`, then shut it down
pub async fn drive<R>(supervisor: &Supervisor, input: R) -> Result<i32>
where
    R: AsyncBufRead + Unpin,
{
    let hook = SupervisorHook::new(supervisor.clone());
    let delivered = events::pump(input, &hook)
        .await
        .context("reading build events")?;

    info!(events = delivered, "Input closed, shutting down");
    Ok(shutdown_exit_code(supervisor).await)
}
