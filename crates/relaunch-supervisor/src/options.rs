//! Supervisor options

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use relaunch_process::ProcessConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SupervisorError};

/// Debug port tried first
pub const DEFAULT_PORT: u16 = 5858;
/// Log attribution label
pub const DEFAULT_TITLE: &str = "MAIN PROCESS";
/// Flag carrying the debug port, rendered as `<flag>=<port>`
pub const DEFAULT_INSPECT_FLAG: &str = "--inspect";
/// Bound on confirming a kill
pub const DEFAULT_KILL_TIMEOUT_MS: u64 = 5_000;
/// Ports tried above the preferred one
pub const DEFAULT_PORT_SCAN_LIMIT: u16 = 1_000;

/// What `trigger` does when the previous instance cannot be killed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillFailurePolicy {
    /// Keep the old instance as current and report the error
    #[default]
    Abort,
    /// Log, drop the old handle and spawn anyway
    Continue,
}

/// Everything needed to run one supervised executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorOptions {
    /// Preferred debug port, `None` launches without a debug flag
    pub port: Option<u16>,
    /// Label attached to captured output
    pub title: String,
    /// Executable to run
    pub command: String,
    /// Arguments after the debug flag
    pub args: Vec<String>,
    /// Working directory
    pub working_dir: Option<PathBuf>,
    /// Extra environment
    pub env: HashMap<String, String>,
    /// Debug flag name
    pub inspect_flag: String,
    /// Kill confirmation bound in milliseconds
    pub kill_timeout_ms: u64,
    /// How far above `port` to search for a free one
    pub port_scan_limit: u16,
    /// Reaction to a failed kill before respawning
    pub kill_failure_policy: KillFailurePolicy,
    /// Let the child read the host's stdin
    pub inherit_stdin: bool,
    /// Install SIGINT/SIGTERM handling when the supervisor is built
    pub handle_signals: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            title: DEFAULT_TITLE.to_string(),
            command: String::new(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            inspect_flag: DEFAULT_INSPECT_FLAG.to_string(),
            kill_timeout_ms: DEFAULT_KILL_TIMEOUT_MS,
            port_scan_limit: DEFAULT_PORT_SCAN_LIMIT,
            kill_failure_policy: KillFailurePolicy::default(),
            inherit_stdin: true,
            handle_signals: true,
        }
    }
}

impl SupervisorOptions {
    /// Options for `command` with everything else defaulted
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the preferred debug port, `None` to disable
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Set the log title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Enable or disable signal handling
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Set the kill failure policy
    pub fn kill_failure_policy(mut self, policy: KillFailurePolicy) -> Self {
        self.kill_failure_policy = policy;
        self
    }

    /// Kill confirmation bound
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// `--inspect=<port>` style argument
    pub fn debug_argument(&self, port: u16) -> String {
        format!("{}={}", self.inspect_flag, port)
    }

    /// Full argument list, debug flag first when a port was allocated
    pub fn arguments(&self, port: Option<u16>) -> Vec<String> {
        port.map(|port| self.debug_argument(port))
            .into_iter()
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Process configuration for one launch
    pub fn process_config(&self, port: Option<u16>) -> ProcessConfig {
        let mut config = ProcessConfig::new(&self.command)
            .args(self.arguments(port))
            .kill_timeout(self.kill_timeout())
            .inherit_stdin(self.inherit_stdin);
        if let Some(ref dir) = self.working_dir {
            config = config.working_dir(dir);
        }
        for (key, value) in &self.env {
            config = config.env(key, value);
        }
        config
    }

    /// Reject options that can never launch anything
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(SupervisorError::InvalidOptions(
                "command must not be empty".to_string(),
            ));
        }
        if self.kill_timeout_ms == 0 {
            return Err(SupervisorError::InvalidOptions(
                "kill_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.port == Some(0) {
            return Err(SupervisorError::InvalidOptions(
                "port must be between 1 and 65535".to_string(),
            ));
        }
        if self.port.is_some() && self.inspect_flag.trim().is_empty() {
            return Err(SupervisorError::InvalidOptions(
                "inspect_flag must not be empty when a debug port is set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let options = SupervisorOptions::default();
        assert_eq!(options.port, Some(5858));
        assert_eq!(options.title, "MAIN PROCESS");
        assert_eq!(options.inspect_flag, "--inspect");
        assert_eq!(options.kill_failure_policy, KillFailurePolicy::Abort);
        assert!(options.handle_signals);
    }

    #[test]
    fn test_debug_flag_precedes_args() {
        let options = SupervisorOptions::new("electron").args(["."]);
        assert_eq!(options.arguments(Some(5859)), vec!["--inspect=5859", "."]);
        assert_eq!(options.arguments(None), vec!["."]);
    }

    #[test]
    fn test_process_config_carries_everything() {
        let mut options = SupervisorOptions::new("node").args(["server.js"]);
        options.working_dir = Some(PathBuf::from("/srv"));
        options.env.insert("DEBUG".into(), "1".into());
        options.kill_timeout_ms = 1_500;
        options.inherit_stdin = false;

        let config = options.process_config(Some(9229));
        assert_eq!(config.command, "node");
        assert_eq!(config.args, vec!["--inspect=9229", "server.js"]);
        assert_eq!(config.working_dir, Some(PathBuf::from("/srv")));
        assert_eq!(config.env.get("DEBUG").map(String::as_str), Some("1"));
        assert_eq!(config.kill_timeout, Duration::from_millis(1_500));
        assert!(!config.inherit_stdin);
    }

    #[test]
    fn test_validate() {
        assert!(SupervisorOptions::new("electron").validate().is_ok());
        assert!(SupervisorOptions::default().validate().is_err());
        assert!(SupervisorOptions::new("electron")
            .port(Some(0))
            .validate()
            .is_err());

        let mut options = SupervisorOptions::new("electron");
        options.inspect_flag.clear();
        assert!(options.validate().is_err());
        assert!(options.port(None).validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let options: SupervisorOptions = serde_json::from_str(
            r#"{ "command": "electron", "port": 9000, "kill_failure_policy": "continue" }"#,
        )
        .unwrap();
        assert_eq!(options.port, Some(9000));
        assert_eq!(options.title, DEFAULT_TITLE);
        assert_eq!(options.kill_failure_policy, KillFailurePolicy::Continue);
        assert_eq!(
            options,
            SupervisorOptions::new("electron")
                .port(Some(9000))
                .kill_failure_policy(KillFailurePolicy::Continue)
        );
    }
}
