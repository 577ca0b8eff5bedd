// Command-line interface definition

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use relaunch_supervisor::KillFailurePolicy;

/// Restart a dev build's executable after every successful build
///
/// Build events are read from stdin, one per line: `ok`, `done`, `success`
/// or `built` restart the process, `fail`, `failed` or `error` keep the
/// current one running.
#[derive(Debug, Parser)]
#[command(name = "relaunch", version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Preferred debug port
    #[arg(short, long, conflicts_with = "no_debug_port")]
    pub port: Option<u16>,

    /// Launch without a debug port
    #[arg(long)]
    pub no_debug_port: bool,

    /// Title attached to captured output
    #[arg(short, long)]
    pub title: Option<String>,

    /// Flag used to pass the debug port
    #[arg(long, value_name = "FLAG")]
    pub inspect_flag: Option<String>,

    /// Time allowed for a killed process tree to disappear
    #[arg(long, value_name = "MS")]
    pub kill_timeout_ms: Option<u64>,

    /// What to do when the previous instance cannot be killed
    #[arg(long, value_enum)]
    pub on_kill_failure: Option<KillFailureArg>,

    /// Launch once at startup without waiting for a build event
    #[arg(long)]
    pub start: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Executable and arguments to supervise
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// `--on-kill-failure` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KillFailureArg {
    /// Keep the old instance and skip the restart
    Abort,
    /// Spawn a replacement anyway
    Continue,
}

impl From<KillFailureArg> for KillFailurePolicy {
    fn from(arg: KillFailureArg) -> Self {
        match arg {
            KillFailureArg::Abort => KillFailurePolicy::Abort,
            KillFailureArg::Continue => KillFailurePolicy::Continue,
        }
    }
}
