//! Routing of captured process output
//!
//! Every chunk read from a supervised process is wrapped in a [`LogRecord`]
//! and handed to a [`LogSink`]. Chunks are passed through as the pipe delivers
//! them; nothing here buffers or splits lines.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use colored::Colorize;

/// Which pipe a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// stdout
    Info,
    /// stderr
    Warn,
}

impl Stream {
    /// Banner label
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Info => "Info",
            Stream::Warn => "Warn",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chunk of output attributed to a process
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Supervisor title
    pub title: &'a str,
    /// Process ID, if known
    pub pid: Option<u32>,
    /// Source pipe
    pub stream: Stream,
    /// Raw bytes as read
    pub data: &'a [u8],
}

impl LogRecord<'_> {
    /// PID for display, `--` when unknown
    pub fn pid_label(&self) -> String {
        self.pid
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "--".to_string())
    }

    /// Payload decoded lossily as UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.data)
    }
}

/// Receives output chunks from supervised processes
pub trait LogSink: Send + Sync {
    /// Handle one chunk
    fn emit(&self, record: &LogRecord<'_>);
}

/// Default sink: banner-framed output on the console
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    use_colors: bool,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl ConsoleSink {
    /// Console sink with explicit color choice
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Render a record as start banner, payload and end banner
    pub fn render(&self, record: &LogRecord<'_>) -> String {
        let label = format!("{} [{}]", record.title, record.pid_label());
        let start = format!("{} Start", record.stream);
        let end = format!("{} End", record.stream);
        let payload = record.text();

        if !self.use_colors {
            return format!("{label} {start}\n{payload}\n{label} {end}\n");
        }

        // Pad inside the colored background
        let label = format!(" {label} ");

        match record.stream {
            Stream::Info => format!(
                "{} {}\n{}\n{} {}\n",
                label.black().on_green(),
                start.green(),
                payload.bright_yellow(),
                label.black().on_green(),
                end.green(),
            ),
            Stream::Warn => format!(
                "{} {}\n{}\n{} {}\n",
                label.black().on_red(),
                start.red(),
                payload.bright_red(),
                label.black().on_red(),
                end.red(),
            ),
        }
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, record: &LogRecord<'_>) {
        let rendered = self.render(record);
        let mut stdout = std::io::stdout().lock();
        // A closed console must not take the supervisor down
        let _ = stdout.write_all(rendered.as_bytes());
        let _ = stdout.flush();
    }
}

/// Caller-supplied handler for one stream
pub type RecordCallback = Arc<dyn Fn(&LogRecord<'_>) + Send + Sync>;

/// Sink with per-stream overrides
///
/// A stream with a callback is handled entirely by it; a stream without one
/// goes to the fallback sink ([`ConsoleSink`] unless replaced).
#[derive(Clone)]
pub struct CallbackSink {
    info: Option<RecordCallback>,
    warn: Option<RecordCallback>,
    fallback: Arc<dyn LogSink>,
}

impl CallbackSink {
    /// No overrides, console fallback
    pub fn new() -> Self {
        Self {
            info: None,
            warn: None,
            fallback: Arc::new(ConsoleSink::default()),
        }
    }

    /// Override stdout handling
    pub fn on_info<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LogRecord<'_>) + Send + Sync + 'static,
    {
        self.info = Some(Arc::new(callback));
        self
    }

    /// Override stderr handling
    pub fn on_warn<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LogRecord<'_>) + Send + Sync + 'static,
    {
        self.warn = Some(Arc::new(callback));
        self
    }

    /// Replace the sink used for streams without an override
    pub fn with_fallback(mut self, fallback: Arc<dyn LogSink>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set both overrides from optional callbacks
    pub fn with_callbacks(
        mut self,
        info: Option<RecordCallback>,
        warn: Option<RecordCallback>,
    ) -> Self {
        self.info = info;
        self.warn = warn;
        self
    }
}

impl Default for CallbackSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink")
            .field("info", &self.info.is_some())
            .field("warn", &self.warn.is_some())
            .finish_non_exhaustive()
    }
}

impl LogSink for CallbackSink {
    fn emit(&self, record: &LogRecord<'_>) {
        let callback = match record.stream {
            Stream::Info => self.info.as_ref(),
            Stream::Warn => self.warn.as_ref(),
        };
        match callback {
            Some(callback) => callback(record),
            None => self.fallback.emit(record),
        }
    }
}
