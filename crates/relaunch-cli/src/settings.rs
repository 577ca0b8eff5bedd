//! Option loading: config file, then environment, then command line

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use relaunch_supervisor::SupervisorOptions;

use crate::cli::Cli;

/// Prefix for environment overrides, e.g. `RELAUNCH_PORT=9000`
pub const ENV_PREFIX: &str = "RELAUNCH";

/// Build supervisor options for this invocation
pub fn load(cli: &Cli) -> Result<SupervisorOptions> {
    let mut builder = Config::builder();
    if let Some(ref path) = cli.config {
        builder = builder.add_source(File::from(path.clone()).required(true));
    }
    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("reading configuration")?;

    let mut options: SupervisorOptions = config
        .try_deserialize()
        .context("parsing configuration")?;
    apply_overrides(cli, &mut options);

    if options.command.trim().is_empty() {
        bail!("no command to supervise; pass it after `--` or set `command` in the config file");
    }
    Ok(options)
}

/// Command-line flags win over file and environment
pub fn apply_overrides(cli: &Cli, options: &mut SupervisorOptions) {
    if let Some((command, args)) = cli.command.split_first() {
        options.command = command.clone();
        options.args = args.to_vec();
    }
    if cli.no_debug_port {
        options.port = None;
    } else if let Some(port) = cli.port {
        options.port = Some(port);
    }
    if let Some(ref title) = cli.title {
        options.title = title.clone();
    }
    if let Some(ref flag) = cli.inspect_flag {
        options.inspect_flag = flag.clone();
    }
    if let Some(ms) = cli.kill_timeout_ms {
        options.kill_timeout_ms = ms;
    }
    if let Some(policy) = cli.on_kill_failure {
        options.kill_failure_policy = policy.into();
    }
    // stdin carries build events
    options.inherit_stdin = false;
}
