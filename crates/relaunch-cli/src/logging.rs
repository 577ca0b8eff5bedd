// Diagnostic logging setup

use tracing::Level;

/// Pick the effective level from the command-line flags
///
/// `--verbose` and `--quiet` take precedence over `--log-level`. Unknown
/// level names fall back to info.
pub fn resolve_level(log_level: &str, verbose: bool, quiet: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    if quiet {
        return Level::ERROR;
    }
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber
///
/// Logs go to stderr; stdout belongs to the supervised process output.
pub fn init_logging(level: Level) {
    use tracing_subscriber::fmt;

    let detailed = level >= Level::DEBUG;
    fmt()
        .with_max_level(level)
        .with_target(detailed)
        .with_file(detailed)
        .with_line_number(detailed)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_levels() {
        assert_eq!(resolve_level("trace", false, false), Level::TRACE);
        assert_eq!(resolve_level("WARN", false, false), Level::WARN);
        assert_eq!(resolve_level("error", false, false), Level::ERROR);
    }

    #[test]
    fn test_unknown_level_is_info() {
        assert_eq!(resolve_level("loud", false, false), Level::INFO);
    }

    #[test]
    fn test_flags_win() {
        assert_eq!(resolve_level("error", true, false), Level::DEBUG);
        assert_eq!(resolve_level("trace", false, true), Level::ERROR);
    }
}
