//! Build pipeline adapter

use async_trait::async_trait;
use tracing::{debug, error};

use crate::supervisor::Supervisor;

/// Outcome of one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    /// Output is fresh, restart the app
    Succeeded,
    /// Keep whatever is running
    Failed,
}

/// What a hook did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// A new instance is running
    Restarted { pid: u32 },
    /// Event did not call for a restart
    Skipped,
    /// Restart was attempted and failed; already logged
    Failed,
}

/// Receives build completion events
#[async_trait]
pub trait BuildHook: Send + Sync {
    /// Handle one build completion. Never propagates errors to the pipeline.
    async fn on_build(&self, event: BuildEvent) -> HookOutcome;
}

/// Restarts a [`Supervisor`] after every successful build
#[derive(Debug, Clone)]
pub struct SupervisorHook {
    supervisor: Supervisor,
}

impl SupervisorHook {
    /// Wrap a supervisor
    pub fn new(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }

    /// The wrapped supervisor
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }
}

#[async_trait]
impl BuildHook for SupervisorHook {
    async fn on_build(&self, event: BuildEvent) -> HookOutcome {
        match event {
            BuildEvent::Failed => {
                debug!(title = %self.supervisor.title(), "Build failed, keeping current instance");
                HookOutcome::Skipped
            }
            BuildEvent::Succeeded => match self.supervisor.trigger().await {
                Ok(pid) => HookOutcome::Restarted { pid },
                Err(e) => {
                    error!(title = %self.supervisor.title(), error = %e, "Restart after build failed");
                    HookOutcome::Failed
                }
            },
        }
    }
}
