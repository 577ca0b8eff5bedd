//! Shared helpers for supervisor integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use relaunch_supervisor::{LogRecord, LogSink, Stream, SupervisorOptions};

/// One captured output chunk
#[derive(Debug, Clone)]
pub struct Captured {
    pub title: String,
    pub pid: Option<u32>,
    pub stream: Stream,
    pub text: String,
}

/// Sink that keeps everything in memory
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<Captured>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Captured> {
        self.records.lock().unwrap().clone()
    }

    pub fn text(&self, stream: Stream) -> String {
        self.records()
            .into_iter()
            .filter(|record| record.stream == stream)
            .map(|record| record.text)
            .collect()
    }

    /// Poll until `needle` shows up on `stream`
    pub async fn wait_for(&self, stream: Stream, needle: &str) -> bool {
        eventually(|| self.text(stream).contains(needle)).await
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord<'_>) {
        self.records.lock().unwrap().push(Captured {
            title: record.title.to_string(),
            pid: record.pid,
            stream: record.stream,
            text: record.text().into_owned(),
        });
    }
}

/// Poll `condition` every 20ms for up to five seconds
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// `sh -c script` without a debug port or signal handling
pub fn shell(script: &str) -> SupervisorOptions {
    let mut options = SupervisorOptions::new("sh")
        .args(["-c", script])
        .port(None)
        .handle_signals(false);
    options.inherit_stdin = false;
    options
}
