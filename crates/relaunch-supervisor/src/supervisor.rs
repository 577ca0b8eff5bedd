//! Single-instance supervisor
//!
//! Each [`Supervisor::trigger`] runs kill-old → allocate-port → spawn-new
//! under one async mutex, so overlapping triggers queue up and there is never
//! more than one live instance. [`Supervisor::shutdown`] takes the same lock.
//!
//! An instance that could not be confirmed dead under
//! [`KillFailurePolicy::Continue`] is kept as a stray. Strays are killed again
//! at every trigger and at shutdown, and shutdown fails while any survive.

use std::sync::{Arc, Weak};
use std::time::Duration;

use relaunch_process::{
    CallbackSink, ConsoleSink, ExitCallback, ExitReport, LogRecord, LogSink, ProcessHandle,
    ProcessManager, RecordCallback,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    error::{PortError, Result, SupervisorError},
    options::{KillFailurePolicy, SupervisorOptions},
    ports::{PortAllocator, ScanningAllocator},
    signals::SignalBridge,
};

/// Bound on a single port allocation
const ALLOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the supervisor has launched and not yet seen die
#[derive(Debug, Default)]
struct Instances {
    current: Option<ProcessHandle>,
    strays: Vec<ProcessHandle>,
}

type Slot = Mutex<Instances>;

/// Keeps exactly one instance of an executable running
///
/// Cheap to clone; clones share the same slot and lock.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    options: SupervisorOptions,
    allocator: Arc<dyn PortAllocator>,
    manager: ProcessManager,
    instances: Arc<Slot>,
}

impl Supervisor {
    /// Start building a supervisor
    pub fn builder(options: SupervisorOptions) -> SupervisorBuilder {
        SupervisorBuilder::new(options)
    }

    /// Options this supervisor was built with
    pub fn options(&self) -> &SupervisorOptions {
        &self.inner.options
    }

    /// Log attribution label
    pub fn title(&self) -> &str {
        &self.inner.options.title
    }

    /// PID of the live instance, if any
    pub async fn current_pid(&self) -> Option<u32> {
        let instances = self.inner.instances.lock().await;
        instances
            .current
            .as_ref()
            .filter(|handle| !handle.is_terminal())
            .map(ProcessHandle::pid)
    }

    /// PIDs of superseded instances that may still be running
    pub async fn stray_pids(&self) -> Vec<u32> {
        let instances = self.inner.instances.lock().await;
        instances.strays.iter().map(ProcessHandle::pid).collect()
    }

    /// Replace the running instance with a fresh one
    ///
    /// Returns the PID of the new instance.
    pub async fn trigger(&self) -> Result<u32> {
        let mut guard = self.inner.instances.lock().await;
        let instances = &mut *guard;
        self.kill_strays(&mut instances.strays).await;

        if let Some(handle) = instances.current.as_mut() {
            let pid = handle.pid();
            if handle.is_terminal() {
                debug!(pid = %pid, "Previous instance already exited");
            } else if let Err(source) = handle.terminate().await {
                error!(
                    pid = %pid,
                    title = %self.title(),
                    error = %source,
                    "Failed to terminate previous instance"
                );
                match self.inner.options.kill_failure_policy {
                    KillFailurePolicy::Abort => {
                        return Err(SupervisorError::Terminate { pid, source });
                    }
                    KillFailurePolicy::Continue => {
                        warn!(pid = %pid, "Launching replacement while previous instance may still run");
                        if let Some(stray) = instances.current.take() {
                            instances.strays.push(stray);
                        }
                    }
                }
            } else {
                debug!(pid = %pid, "Previous instance terminated");
            }
            instances.current = None;
        }

        let port = self.select_port().await;
        let config = self.inner.options.process_config(port);
        let handle = self
            .inner
            .manager
            .spawn(&config, self.title(), Some(self.exit_observer()))
            .await
            .map_err(|e| {
                error!(
                    command = %config.command,
                    title = %self.title(),
                    error = %e,
                    "Failed to spawn supervised process"
                );
                SupervisorError::Spawn(e)
            })?;

        let pid = handle.pid();
        info!(pid = %pid, port = ?port, title = %self.title(), "Supervised process started");
        instances.current = Some(handle);
        Ok(pid)
    }

    /// Stop the live instance and any strays
    ///
    /// Idempotent: with nothing running this returns immediately. Fails while
    /// the live instance or a stray cannot be confirmed dead.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.inner.instances.lock().await;
        let instances = &mut *guard;
        self.kill_strays(&mut instances.strays).await;

        if let Some(handle) = instances.current.as_mut() {
            let pid = handle.pid();
            match handle.terminate().await {
                Ok(()) => {
                    instances.current = None;
                    info!(pid = %pid, title = %self.title(), "Supervised process stopped");
                }
                Err(source) => {
                    error!(pid = %pid, error = %source, "Failed to stop supervised process");
                    return Err(SupervisorError::Terminate { pid, source });
                }
            }
        } else {
            debug!("Nothing to shut down");
        }

        if instances.strays.is_empty() {
            Ok(())
        } else {
            let pids: Vec<u32> = instances.strays.iter().map(ProcessHandle::pid).collect();
            error!(pids = ?pids, "Superseded instances still running");
            Err(SupervisorError::Strays { pids })
        }
    }

    /// Retry termination, keeping only strays that still resist
    async fn kill_strays(&self, strays: &mut Vec<ProcessHandle>) {
        let mut survivors = Vec::new();
        for mut stray in strays.drain(..) {
            if let Err(e) = stray.terminate().await {
                warn!(pid = %stray.pid(), error = %e, "Superseded instance still not terminated");
                survivors.push(stray);
            } else {
                debug!(pid = %stray.pid(), "Superseded instance terminated");
            }
        }
        *strays = survivors;
    }

    async fn select_port(&self) -> Option<u16> {
        let preferred = self.inner.options.port?;
        let allocated =
            tokio::time::timeout(ALLOCATION_TIMEOUT, self.inner.allocator.allocate(preferred))
                .await
                .unwrap_or(Err(PortError::Timeout {
                    millis: ALLOCATION_TIMEOUT.as_millis() as u64,
                }));
        match allocated {
            Ok(port) => Some(port),
            Err(e) => {
                warn!(preferred, error = %e, "No debug port available, launching without one");
                None
            }
        }
    }

    /// Clears the slot when its process exits on its own
    fn exit_observer(&self) -> ExitCallback {
        let slot: Weak<Slot> = Arc::downgrade(&self.inner.instances);
        let title = self.inner.options.title.clone();
        Box::new(move |report: ExitReport| {
            warn!(
                pid = %report.pid,
                code = ?report.code,
                title = %title,
                "Supervised process exited unexpectedly"
            );
            let Some(slot) = slot.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                let mut instances = slot.lock().await;
                let stale = instances
                    .current
                    .as_ref()
                    .is_some_and(|handle| handle.pid() == report.pid && handle.is_terminal());
                if stale {
                    instances.current = None;
                }
            });
        })
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Configures a [`Supervisor`]
pub struct SupervisorBuilder {
    options: SupervisorOptions,
    allocator: Option<Arc<dyn PortAllocator>>,
    sink: Option<Arc<dyn LogSink>>,
    on_info: Option<RecordCallback>,
    on_warn: Option<RecordCallback>,
}

impl SupervisorBuilder {
    fn new(options: SupervisorOptions) -> Self {
        Self {
            options,
            allocator: None,
            sink: None,
            on_info: None,
            on_warn: None,
        }
    }

    /// Replace the default [`ScanningAllocator`]
    pub fn allocator(mut self, allocator: Arc<dyn PortAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Replace output handling entirely
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Handle stdout chunks instead of printing them
    pub fn on_info<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LogRecord<'_>) + Send + Sync + 'static,
    {
        self.on_info = Some(Arc::new(callback));
        self
    }

    /// Handle stderr chunks instead of printing them
    pub fn on_warn<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LogRecord<'_>) + Send + Sync + 'static,
    {
        self.on_warn = Some(Arc::new(callback));
        self
    }

    /// Validate options and build
    ///
    /// With `handle_signals` set this installs the [`SignalBridge`], which
    /// needs a running tokio runtime.
    pub fn build(self) -> Result<Supervisor> {
        self.options.validate()?;

        let sink: Arc<dyn LogSink> = match (self.sink, self.on_info, self.on_warn) {
            (Some(sink), _, _) => sink,
            (None, None, None) => Arc::new(ConsoleSink::default()),
            (None, info, warn) => Arc::new(CallbackSink::new().with_callbacks(info, warn)),
        };
        let allocator: Arc<dyn PortAllocator> = match self.allocator {
            Some(allocator) => allocator,
            None => Arc::new(ScanningAllocator::new(self.options.port_scan_limit)),
        };

        let supervisor = Supervisor {
            inner: Arc::new(Inner {
                manager: ProcessManager::new(sink),
                allocator,
                instances: Arc::new(Mutex::new(Instances::default())),
                options: self.options,
            }),
        };

        if supervisor.options().handle_signals {
            SignalBridge::install(supervisor.clone())?;
        }
        Ok(supervisor)
    }
}

impl std::fmt::Debug for SupervisorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorBuilder")
            .field("options", &self.options)
            .field("custom_allocator", &self.allocator.is_some())
            .field("custom_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}
