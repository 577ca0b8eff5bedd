//! Process tree inspection and termination

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sysinfo::{Pid, ProcessStatus, System};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{ProcessError, Result};

/// Interval between liveness checks while confirming a kill
const GONE_POLL_INTERVAL_MS: u64 = 25;

/// All transitive children of `root`, parents before children
pub fn descendants(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes();

    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }

    let root = Pid::from_u32(root);
    let mut found = Vec::new();
    let mut seen = HashSet::from([root]);
    let mut queue = vec![root];
    while let Some(pid) = queue.pop() {
        for child in children.get(&pid).into_iter().flatten() {
            if seen.insert(*child) {
                found.push(child.as_u32());
                queue.push(*child);
            }
        }
    }
    found
}

/// Whether `pid` names a live process. Zombies count as dead.
pub fn is_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return false;
    }
    system
        .process(pid)
        .map(|process| !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
        .unwrap_or(false)
}

/// Kill the process group led by `root` plus every pid in `descendants`
///
/// Uses SIGKILL throughout. `ESRCH` counts as success.
#[cfg(unix)]
pub async fn kill_tree(root: u32, descendants: &[u32]) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid as NixPid;

    let leader = NixPid::from_raw(root as i32);
    match killpg(leader, Signal::SIGKILL) {
        Ok(()) => debug!(pid = root, "Sent SIGKILL to process group"),
        Err(Errno::ESRCH) => match kill(leader, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => debug!(pid = root, "Process group already gone"),
            Err(e) => return Err(ProcessError::KillFailed(format!("pid {root}: {e}"))),
        },
        Err(e) => {
            return Err(ProcessError::KillFailed(format!(
                "process group {root}: {e}"
            )))
        }
    }

    // Children that left the group (setsid, setpgid) still die here
    let mut first_error = None;
    for &pid in descendants {
        match kill(NixPid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => {
                warn!(pid, error = %e, "Failed to kill descendant process");
                first_error.get_or_insert(ProcessError::KillFailed(format!("pid {pid}: {e}")));
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Kill the task tree rooted at `root` via `taskkill /t`
#[cfg(windows)]
pub async fn kill_tree(root: u32, _descendants: &[u32]) -> Result<()> {
    use std::process::Stdio;
    use tokio::process::Command;

    // taskkill exits with 128 when the pid no longer exists
    const TASKKILL_NOT_FOUND: i32 = 128;

    let status = Command::new("taskkill")
        .args(["/pid", &root.to_string(), "/f", "/t"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| ProcessError::KillFailed(e.to_string()))?;

    if status.success() || status.code() == Some(TASKKILL_NOT_FOUND) {
        debug!(pid = root, "Windows process tree killed");
        Ok(())
    } else {
        Err(ProcessError::KillFailed(format!(
            "taskkill for pid {root} exited with {status}"
        )))
    }
}

/// Wait until none of `pids` is alive, or fail at `deadline`
pub async fn wait_gone(pids: &[u32], deadline: Instant) -> Result<()> {
    let mut remaining = pids.to_vec();
    loop {
        remaining.retain(|pid| is_alive(*pid));
        if remaining.is_empty() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ProcessError::Survivors { pids: remaining });
        }
        sleep(Duration::from_millis(GONE_POLL_INTERVAL_MS)).await;
    }
}
