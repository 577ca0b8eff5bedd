//! Build events read from a line-oriented stream
//!
//! A build script signals each finished build with one line on stdin, e.g.
//! `tsc --watch | relaunch-adapter | relaunch -- electron .`.

use relaunch_supervisor::{BuildEvent, BuildHook};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLine {
    Event(BuildEvent),
    Blank,
    Unknown(String),
}

/// Parse a single line, ignoring case and surrounding whitespace
pub fn parse_event(line: &str) -> EventLine {
    let word = line.trim();
    if word.is_empty() {
        return EventLine::Blank;
    }
    match word.to_ascii_lowercase().as_str() {
        "ok" | "done" | "success" | "built" => EventLine::Event(BuildEvent::Succeeded),
        "fail" | "failed" | "error" => EventLine::Event(BuildEvent::Failed),
        _ => EventLine::Unknown(word.to_string()),
    }
}

/// Feed every event from `reader` to `hook` until end of input
///
/// Returns the number of events delivered.
pub async fn pump<R>(reader: R, hook: &dyn BuildHook) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0;

    while let Some(line) = lines.next_line().await? {
        match parse_event(&line) {
            EventLine::Event(event) => {
                debug!(?event, "Build event");
                let outcome = hook.on_build(event).await;
                debug!(?outcome, "Build event handled");
                delivered += 1;
            }
            EventLine::Blank => {}
            EventLine::Unknown(word) => warn!(line = %word, "Ignoring unrecognized build event"),
        }
    }

    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaunch_supervisor::HookOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<BuildEvent>>,
    }

    #[async_trait]
    impl BuildHook for Recorder {
        async fn on_build(&self, event: BuildEvent) -> HookOutcome {
            self.events.lock().unwrap().push(event);
            HookOutcome::Skipped
        }
    }

    #[test]
    fn test_parse_event_words() {
        assert_eq!(parse_event("ok"), EventLine::Event(BuildEvent::Succeeded));
        assert_eq!(parse_event("  BUILT\r"), EventLine::Event(BuildEvent::Succeeded));
        assert_eq!(parse_event("error"), EventLine::Event(BuildEvent::Failed));
        assert_eq!(parse_event("   "), EventLine::Blank);
        assert_eq!(parse_event("rebuild?"), EventLine::Unknown("rebuild?".to_string()));
    }

    #[tokio::test]
    async fn test_pump_delivers_in_order() {
        let input: &[u8] = b"ok\n\nnonsense\nfailed\ndone";
        let recorder = Recorder::default();

        let delivered = pump(input, &recorder).await.unwrap();

        assert_eq!(delivered, 3);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![BuildEvent::Succeeded, BuildEvent::Failed, BuildEvent::Succeeded]
        );
    }

    #[tokio::test]
    async fn test_pump_empty_input() {
        let input: &[u8] = b"";
        assert_eq!(pump(input, &Recorder::default()).await.unwrap(), 0);
    }
}
