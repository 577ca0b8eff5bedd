//! Handle to one supervised process

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    error::{ProcessError, Result},
    tree,
};

/// How far a process has got through its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Spawned and not yet reaped
    Running,
    /// Reaped after an explicit termination
    Killed,
    /// Reaped without anyone asking it to stop
    ExitedNaturally,
}

impl ExitState {
    /// Killed and ExitedNaturally are final
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExitState::Running)
    }
}

/// Owned handle to a spawned process
///
/// The child itself is owned by a waiter task that reaps it and publishes the
/// final [`ExitState`]; the handle observes that state and drives termination.
#[derive(Debug)]
pub struct ProcessHandle {
    /// Process ID, fixed at spawn
    pid: u32,
    /// Published by the waiter task
    state: watch::Receiver<ExitState>,
    /// Set while a termination is in flight so the waiter reports `Killed`
    killing: Arc<AtomicBool>,
    /// Bound on confirming a kill
    kill_timeout: Duration,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        state: watch::Receiver<ExitState>,
        killing: Arc<AtomicBool>,
        kill_timeout: Duration,
    ) -> Self {
        Self {
            pid,
            state,
            killing,
            kill_timeout,
        }
    }

    /// Handle for a process reaped by the caller
    ///
    /// The exit state is published through the returned sender. Until it is,
    /// `terminate` signals the tree but cannot confirm the reap.
    #[cfg(any(test, feature = "test-util"))]
    pub fn detached(pid: u32, kill_timeout: Duration) -> (Self, watch::Sender<ExitState>) {
        let (state_tx, state_rx) = watch::channel(ExitState::Running);
        let handle = Self::new(pid, state_rx, Arc::new(AtomicBool::new(false)), kill_timeout);
        (handle, state_tx)
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Current exit state
    pub fn state(&self) -> ExitState {
        *self.state.borrow()
    }

    /// Check if process is still running
    pub fn is_running(&self) -> bool {
        self.state() == ExitState::Running
    }

    /// Check if process reached a final state
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Wait until the process has been reaped
    pub async fn wait(&self) -> ExitState {
        let mut state = self.state.clone();
        reaped(&mut state).await;
        let reached = *state.borrow();
        reached
    }

    /// Kill the process tree and wait for confirmation
    ///
    /// Resolves once the process has been reaped and every descendant seen at
    /// kill time is gone. A handle already in a terminal state returns
    /// immediately without touching the OS.
    pub async fn terminate(&mut self) -> Result<()> {
        if self.is_terminal() {
            debug!(pid = %self.pid, state = ?self.state(), "Process already finished, nothing to kill");
            return Ok(());
        }

        debug!(pid = %self.pid, "Killing process tree");
        let descendants = tree::descendants(self.pid);
        let deadline = Instant::now() + self.kill_timeout;

        self.killing.store(true, Ordering::SeqCst);
        if let Err(e) = tree::kill_tree(self.pid, &descendants).await {
            self.killing.store(false, Ordering::SeqCst);
            warn!(pid = %self.pid, error = %e, "Failed to kill process tree");
            return Err(e);
        }

        let mut state = self.state.clone();
        if tokio::time::timeout_at(deadline, reaped(&mut state))
            .await
            .is_err()
        {
            warn!(pid = %self.pid, "Timeout waiting for process to exit");
            return Err(ProcessError::Timeout {
                millis: self.kill_timeout.as_millis() as u64,
            });
        }

        tree::wait_gone(&descendants, deadline).await?;
        debug!(pid = %self.pid, descendants = descendants.len(), "Process tree gone");
        Ok(())
    }
}

/// Resolve once the waiter has published a terminal state
async fn reaped(state: &mut watch::Receiver<ExitState>) {
    // A dropped sender means the waiter is gone along with the child
    let _ = state.wait_for(|s| s.is_terminal()).await;
}
