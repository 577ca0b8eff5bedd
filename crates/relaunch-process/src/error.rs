//! Error types for process management

use std::io;
use thiserror::Error;

/// Process management errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to spawn process
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] io::Error),

    /// Spawned process reported no PID
    #[error("Spawned process has no PID")]
    MissingPid,

    /// Termination was not confirmed in time
    #[error("Process tree still alive after {millis}ms")]
    Timeout { millis: u64 },

    /// Descendants outlived the kill
    #[error("Descendant processes survived termination: {pids:?}")]
    Survivors { pids: Vec<u32> },

    /// Failed to kill process
    #[error("Failed to kill process: {0}")]
    KillFailed(String),

    /// Invalid configuration
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
