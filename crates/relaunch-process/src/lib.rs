//! # relaunch-process
//!
//! **Purpose**: Process handles for the relaunch supervisor
//!
//! Spawns one executable, drains its output into a [`LogSink`], tracks how it
//! ended and tears down its whole process tree on request.
//!
//! ## Features
//!
//! - **Process Spawning**: Async process creation in its own process group
//! - **Output Draining**: stdout/stderr forwarded chunk by chunk to a sink
//! - **Exit Tracking**: `Running` → `Killed` / `ExitedNaturally`, observable
//! - **Process Tree Kill**: process group plus snapshotted descendants on Unix,
//!   `taskkill /t` on Windows, confirmed before returning
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relaunch_process::{ConsoleSink, ProcessConfig, ProcessManager};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ProcessManager::new(Arc::new(ConsoleSink::default()));
//!
//! let config = ProcessConfig::new("node").args(["--inspect=5858", "server.js"]);
//! let mut handle = manager.spawn(&config, "SERVER", None).await?;
//!
//! // Kills the process and everything it forked
//! handle.terminate().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod manager;
pub mod output;
pub mod tree;

pub use config::ProcessConfig;
pub use error::{ProcessError, Result};
pub use handle::{ExitState, ProcessHandle};
pub use manager::{ExitCallback, ExitReport, ProcessManager};
pub use output::{CallbackSink, ConsoleSink, LogRecord, LogSink, RecordCallback, Stream};
pub use tree::is_alive;
