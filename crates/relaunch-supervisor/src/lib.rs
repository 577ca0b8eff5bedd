//! # relaunch-supervisor
//!
//! **Purpose**: Keep exactly one instance of a dev build running
//!
//! Every successful build calls [`Supervisor::trigger`], which kills the
//! previous instance and its whole process tree, finds a free debug port and
//! launches a fresh instance with its output attributed to a title and PID.
//! SIGINT/SIGTERM shut the instance down before the host exits.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relaunch_supervisor::{BuildEvent, BuildHook, Supervisor, SupervisorHook, SupervisorOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = SupervisorOptions::new("electron").args(["."]).title("APP");
//! let supervisor = Supervisor::builder(options).build()?;
//!
//! let hook = SupervisorHook::new(supervisor.clone());
//! hook.on_build(BuildEvent::Succeeded).await;
//!
//! supervisor.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hook;
pub mod options;
pub mod ports;
pub mod signals;
pub mod supervisor;

pub use error::{PortError, Result, SupervisorError};
pub use hook::{BuildEvent, BuildHook, HookOutcome, SupervisorHook};
pub use options::{KillFailurePolicy, SupervisorOptions};
pub use ports::{PortAllocator, ScanningAllocator};
pub use signals::{shutdown_exit_code, SignalBridge};
pub use supervisor::{Supervisor, SupervisorBuilder};

pub use relaunch_process::{CallbackSink, ConsoleSink, LogRecord, LogSink, Stream};
