//! End-to-end restart behaviour against real child processes

#![cfg(unix)]

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{eventually, shell, MemorySink};
use relaunch_process::is_alive;
use relaunch_supervisor::{
    BuildEvent, BuildHook, HookOutcome, PortAllocator, PortError, Stream, Supervisor,
    SupervisorHook, SupervisorOptions,
};

struct NoPorts;

#[async_trait]
impl PortAllocator for NoPorts {
    async fn allocate(&self, preferred: u16) -> Result<u16, PortError> {
        Err(PortError::Exhausted {
            start: preferred,
            end: preferred,
        })
    }
}

fn echo(port: Option<u16>) -> SupervisorOptions {
    let mut options = SupervisorOptions::new("echo")
        .args(["a", "b"])
        .port(port)
        .title("APP")
        .handle_signals(false);
    options.inherit_stdin = false;
    options
}

#[tokio::test]
async fn test_debug_port_is_first_argument() {
    let sink = MemorySink::new();
    let supervisor = Supervisor::builder(echo(Some(9000)))
        .sink(sink.clone())
        .build()
        .unwrap();

    let pid = supervisor.trigger().await.unwrap();
    assert!(sink.wait_for(Stream::Info, " a b").await);

    let output = sink.text(Stream::Info);
    let port: u16 = output
        .trim()
        .strip_prefix("--inspect=")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|port| port.parse().ok())
        .unwrap_or_else(|| panic!("unexpected output: {output:?}"));
    assert!(port >= 9000);

    let records = sink.records();
    assert!(records.iter().all(|r| r.title == "APP" && r.pid == Some(pid)));
}

#[tokio::test]
async fn test_launches_without_debug_port_when_allocation_fails() {
    let sink = MemorySink::new();
    let supervisor = Supervisor::builder(echo(Some(9000)))
        .sink(sink.clone())
        .allocator(Arc::new(NoPorts))
        .build()
        .unwrap();

    supervisor.trigger().await.unwrap();
    assert!(sink.wait_for(Stream::Info, "a b").await);
    assert_eq!(sink.text(Stream::Info).trim(), "a b");
}

#[tokio::test]
async fn test_no_port_configured_skips_debug_argument() {
    let sink = MemorySink::new();
    let supervisor = Supervisor::builder(echo(None))
        .sink(sink.clone())
        .build()
        .unwrap();

    supervisor.trigger().await.unwrap();
    assert!(sink.wait_for(Stream::Info, "a b").await);
    assert!(!sink.text(Stream::Info).contains("--inspect"));
}

#[tokio::test]
async fn test_concurrent_triggers_leave_one_instance() {
    let supervisor = Supervisor::builder(shell("exec sleep 30"))
        .sink(MemorySink::new())
        .build()
        .unwrap();

    let (first, second) = tokio::join!(supervisor.trigger(), supervisor.trigger());
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_ne!(first, second);

    let alive: Vec<u32> = [first, second].into_iter().filter(|pid| is_alive(*pid)).collect();
    assert_eq!(alive.len(), 1);
    assert_eq!(supervisor.current_pid().await, Some(alive[0]));

    supervisor.shutdown().await.unwrap();
    assert!(!is_alive(alive[0]));
}

#[tokio::test]
async fn test_natural_exit_clears_current_and_allows_restart() {
    let sink = MemorySink::new();
    let supervisor = Supervisor::builder(shell("echo bye"))
        .sink(sink.clone())
        .build()
        .unwrap();

    let first = supervisor.trigger().await.unwrap();
    assert!(sink.wait_for(Stream::Info, "bye").await);
    assert!(eventually(|| !is_alive(first)).await);
    assert_eq!(supervisor.current_pid().await, None);

    let second = supervisor.trigger().await.unwrap();
    assert_ne!(first, second);
    supervisor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_kills_whole_tree() {
    let sink = MemorySink::new();
    let supervisor = Supervisor::builder(shell("sleep 30 & echo \"child $!\"; wait"))
        .sink(sink.clone())
        .build()
        .unwrap();

    let parent = supervisor.trigger().await.unwrap();
    assert!(sink.wait_for(Stream::Info, "child ").await);
    let child: u32 = sink
        .text(Stream::Info)
        .trim()
        .strip_prefix("child ")
        .and_then(|pid| pid.trim().parse().ok())
        .unwrap();
    assert!(is_alive(child));

    supervisor.shutdown().await.unwrap();
    assert!(!is_alive(parent));
    assert!(!is_alive(child));
    assert_eq!(supervisor.current_pid().await, None);
}

#[tokio::test]
async fn test_restart_kills_previous_tree() {
    let sink = MemorySink::new();
    let supervisor = Supervisor::builder(shell("sleep 30 & echo \"child $!\"; wait"))
        .sink(sink.clone())
        .build()
        .unwrap();

    let first = supervisor.trigger().await.unwrap();
    assert!(sink.wait_for(Stream::Info, "child ").await);
    let child: u32 = sink
        .records()
        .iter()
        .find(|record| record.pid == Some(first))
        .and_then(|record| record.text.trim().strip_prefix("child ")?.parse().ok())
        .unwrap();

    let second = supervisor.trigger().await.unwrap();
    assert!(!is_alive(first));
    assert!(!is_alive(child));
    assert!(is_alive(second));

    supervisor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_twice_is_noop() {
    let supervisor = Supervisor::builder(shell("exec sleep 30"))
        .sink(MemorySink::new())
        .build()
        .unwrap();

    supervisor.trigger().await.unwrap();
    supervisor.shutdown().await.unwrap();
    supervisor.shutdown().await.unwrap();
    assert_eq!(supervisor.current_pid().await, None);
}

#[tokio::test]
async fn test_output_callbacks_replace_console() {
    let info = Arc::new(Mutex::new(String::new()));
    let warn = Arc::new(Mutex::new(String::new()));
    let (info_out, warn_out) = (info.clone(), warn.clone());

    let supervisor = Supervisor::builder(shell("echo out; echo err >&2; exec sleep 30"))
        .on_info(move |record| info_out.lock().unwrap().push_str(&record.text()))
        .on_warn(move |record| warn_out.lock().unwrap().push_str(&record.text()))
        .build()
        .unwrap();

    supervisor.trigger().await.unwrap();
    assert!(eventually(|| info.lock().unwrap().contains("out")).await);
    assert!(eventually(|| warn.lock().unwrap().contains("err")).await);
    assert!(!info.lock().unwrap().contains("err"));

    supervisor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_build_keeps_instance_running() {
    let supervisor = Supervisor::builder(shell("exec sleep 30"))
        .sink(MemorySink::new())
        .build()
        .unwrap();
    let hook = SupervisorHook::new(supervisor.clone());

    let HookOutcome::Restarted { pid } = hook.on_build(BuildEvent::Succeeded).await else {
        panic!("expected a restart");
    };
    assert_eq!(hook.on_build(BuildEvent::Failed).await, HookOutcome::Skipped);
    assert_eq!(supervisor.current_pid().await, Some(pid));
    assert!(is_alive(pid));

    supervisor.shutdown().await.unwrap();
}
