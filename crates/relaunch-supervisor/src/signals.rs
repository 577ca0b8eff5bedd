//! Host signal handling
//!
//! On SIGINT or SIGTERM the supervised process is shut down and the host
//! exits: code 0 when shutdown succeeded, 1 when it failed. Handlers are
//! process-wide, so the bridge is installed at most once per host process.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};

use crate::{
    error::{Result, SupervisorError},
    supervisor::Supervisor,
};

/// Exit code after a clean signal-driven shutdown
pub const EXIT_OK: i32 = 0;
/// Exit code when the supervised process could not be stopped
pub const EXIT_SHUTDOWN_FAILED: i32 = 1;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Connects host termination signals to [`Supervisor::shutdown`]
#[derive(Debug)]
pub struct SignalBridge;

impl SignalBridge {
    /// Install the bridge for `supervisor`
    ///
    /// Returns `Ok(false)` without doing anything if a bridge is already
    /// installed in this process.
    pub fn install(supervisor: Supervisor) -> Result<bool> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            debug!("Signal bridge already installed");
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            INSTALLED.store(false, Ordering::SeqCst);
            SupervisorError::Signal(e.to_string())
        })?;

        // Register synchronously so no signal slips through before the task runs
        let mut signals = {
            let _guard = runtime.enter();
            ShutdownSignals::register().map_err(|e| {
                INSTALLED.store(false, Ordering::SeqCst);
                SupervisorError::Signal(e.to_string())
            })?
        };

        runtime.spawn(async move {
            let name = signals.recv().await;
            info!(signal = name, title = %supervisor.title(), "Received shutdown signal");
            let code = shutdown_exit_code(&supervisor).await;
            std::process::exit(code);
        });

        debug!("Signal bridge installed");
        Ok(true)
    }
}

/// Shut the supervisor down and map the outcome to a host exit code
pub async fn shutdown_exit_code(supervisor: &Supervisor) -> i32 {
    match supervisor.shutdown().await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!(error = %e, "Shutdown failed");
            EXIT_SHUTDOWN_FAILED
        }
    }
}

#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
    ctrl_break: tokio::signal::windows::CtrlBreak,
}

#[cfg(not(unix))]
impl ShutdownSignals {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
            ctrl_break: tokio::signal::windows::ctrl_break()?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.ctrl_c.recv() => "CTRL_C",
            _ = self.ctrl_break.recv() => "CTRL_BREAK",
        }
    }
}
