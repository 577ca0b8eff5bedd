//! Error types for the supervisor

use relaunch_process::ProcessError;
use thiserror::Error;

/// Supervisor errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The replacement process could not be launched
    #[error("Failed to spawn supervised process: {0}")]
    Spawn(#[source] ProcessError),

    /// A live instance could not be torn down
    #[error("Failed to terminate process {pid}: {source}")]
    Terminate {
        pid: u32,
        #[source]
        source: ProcessError,
    },

    /// Superseded instances could not be confirmed dead
    #[error("Superseded processes still running: {pids:?}")]
    Strays { pids: Vec<u32> },

    /// Options failed validation
    #[error("Invalid supervisor options: {0}")]
    InvalidOptions(String),

    /// Signal handlers could not be installed
    #[error("Signal handling unavailable: {0}")]
    Signal(String),
}

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Port allocation errors
#[derive(Debug, Error)]
pub enum PortError {
    /// Every candidate port was taken
    #[error("No free port in range {start}-{end}")]
    Exhausted { start: u16, end: u16 },

    /// Allocation did not finish in time
    #[error("Port allocation timed out after {millis}ms")]
    Timeout { millis: u64 },
}
