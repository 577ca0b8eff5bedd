//! Process manager - spawning and output wiring

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::ProcessConfig,
    error::{ProcessError, Result},
    handle::{ExitState, ProcessHandle},
    output::{LogRecord, LogSink, Stream},
};

/// Read size for draining pipes
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// What the waiter saw when a process ended on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Process ID
    pub pid: u32,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

/// Invoked once if the process exits without being killed
pub type ExitCallback = Box<dyn FnOnce(ExitReport) + Send + 'static>;

/// Spawns processes and wires their output to a sink
#[derive(Clone)]
pub struct ProcessManager {
    sink: Arc<dyn LogSink>,
}

impl ProcessManager {
    /// Create new process manager
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Spawn a process and start draining its output
    ///
    /// # Arguments
    /// * `config` - Process configuration
    /// * `title` - Attribution label attached to every output chunk
    /// * `on_exit` - Called if the process exits without being terminated
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    /// use relaunch_process::{ConsoleSink, ProcessConfig, ProcessManager};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let manager = ProcessManager::new(Arc::new(ConsoleSink::default()));
    /// let config = ProcessConfig::new("echo").args(["hello"]);
    /// let handle = manager.spawn(&config, "ECHO", None).await?;
    /// handle.wait().await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn spawn(
        &self,
        config: &ProcessConfig,
        title: &str,
        on_exit: Option<ExitCallback>,
    ) -> Result<ProcessHandle> {
        if config.command.trim().is_empty() {
            return Err(ProcessError::InvalidConfig(
                "command must not be empty".to_string(),
            ));
        }

        debug!(
            command = %config.command,
            args = ?config.args,
            "Spawning process"
        );

        // Build command
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        // Set working directory
        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        // Set environment variables
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        // Configure stdio
        cmd.stdin(if config.inherit_stdin {
            Stdio::inherit()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Own process group so the whole tree can be signalled at once
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id().ok_or(ProcessError::MissingPid)?;

        info!(pid = %pid, command = %config.command, title = %title, "Process spawned");

        let title: Arc<str> = Arc::from(title);
        if let Some(stdout) = child.stdout.take() {
            drain(stdout, Stream::Info, Arc::clone(&title), pid, Arc::clone(&self.sink));
        }
        if let Some(stderr) = child.stderr.take() {
            drain(stderr, Stream::Warn, Arc::clone(&title), pid, Arc::clone(&self.sink));
        }

        let (state_tx, state_rx) = watch::channel(ExitState::Running);
        let killing = Arc::new(AtomicBool::new(false));
        let killed_on_request = Arc::clone(&killing);

        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(pid = %pid, error = %e, "Error waiting for process");
                    None
                }
            };

            if killed_on_request.load(Ordering::SeqCst) {
                state_tx.send_replace(ExitState::Killed);
                debug!(pid = %pid, "Process reaped after kill");
                return;
            }

            state_tx.send_replace(ExitState::ExitedNaturally);
            info!(pid = %pid, code = ?code, "Process exited on its own");
            if let Some(on_exit) = on_exit {
                on_exit(ExitReport { pid, code });
            }
        });

        Ok(ProcessHandle::new(pid, state_rx, killing, config.kill_timeout))
    }
}

impl std::fmt::Debug for ProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessManager").finish_non_exhaustive()
    }
}

/// Forward every chunk from `reader` to `sink` until EOF
fn drain<R>(
    mut reader: R,
    stream: Stream,
    title: Arc<str>,
    pid: u32,
    sink: Arc<dyn LogSink>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => sink.emit(&LogRecord {
                    title: &title,
                    pid: Some(pid),
                    stream,
                    data: &buf[..n],
                }),
                Err(e) => {
                    debug!(pid = %pid, stream = %stream, error = %e, "Output pipe closed");
                    break;
                }
            }
        }
    });
}
