//! Rule source adapter.
//!
//! Runs the NAT dump command directly (no shell) with a bounded run time and
//! turns its stdout into an ordered rule snapshot.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, warn};

use natwatch_core::config::SourceConfig;
use natwatch_core::{parse_rule_lines, NatwatchError, RuleSnapshot};

/// Anything that can produce the current rule set.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Capture the current rules. Fails only with
    /// [`NatwatchError::SourceUnavailable`].
    async fn capture(&self) -> Result<RuleSnapshot, NatwatchError>;
}

/// Captures rules from an external command such as `iptables-save -t nat`.
#[derive(Debug, Clone)]
pub struct CommandSource {
    /// Program followed by its arguments.
    command: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.command.clone(), config.timeout())
    }

    /// The command line, for logs and alerts.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[async_trait]
impl RuleSource for CommandSource {
    async fn capture(&self) -> Result<RuleSnapshot, NatwatchError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(NatwatchError::SourceUnavailable(
                "no rule source command configured".to_string(),
            ));
        };

        debug!(command = %self.command_line(), timeout_secs = self.timeout.as_secs(), "capturing rules");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NatwatchError::SourceUnavailable(format!("failed to start {program}: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(NatwatchError::SourceUnavailable(format!(
                    "{program} execution error: {e}"
                )));
            }
            Err(_) => {
                warn!(command = %self.command_line(), timeout_secs = self.timeout.as_secs(), "rule source timed out");
                return Err(NatwatchError::SourceUnavailable(format!(
                    "{program} timed out after {}s",
                    self.timeout.as_secs_f64()
                )));
            }
        };

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "was terminated by a signal".to_string(),
            };
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let detail = if stderr.is_empty() {
                format!("{program} {status}")
            } else {
                format!("{program} {status}: {stderr}")
            };
            return Err(NatwatchError::SourceUnavailable(detail));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let rules = parse_rule_lines(&stdout);
        debug!(rules = rules.len(), "rules captured");

        Ok(RuleSnapshot::new(rules, Utc::now()))
    }
}
