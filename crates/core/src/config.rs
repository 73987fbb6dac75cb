use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NatwatchError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub const DEFAULT_SOURCE_COMMAND: &str = "iptables-save -t nat";
pub const DEFAULT_STATE_FILE: &str = "/var/lib/natwatch/state.json";

/// Looks up a raw variable by name. Empty values count as unset.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Read a profiled var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(lookup: Lookup<'_>, profile: &str, key: &str) -> Option<String> {
    let get = |k: &str| lookup(k).filter(|s| !s.trim().is_empty());
    if !profile.is_empty() {
        if let Some(v) = get(&format!("{}_{}", profile, key)) {
            return Some(v);
        }
    }
    get(key)
}

fn profiled_or(lookup: Lookup<'_>, profile: &str, key: &str, default: &str) -> String {
    profiled_opt(lookup, profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_u64(lookup: Lookup<'_>, profile: &str, key: &str, default: u64) -> u64 {
    match profiled_opt(lookup, profile, key) {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, default, "ignoring non-numeric value");
            default
        }),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Immutable process configuration, built once at startup and handed to
/// each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub source: SourceConfig,
    pub state: StateConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first)
    /// for a named profile. When the profile is set (e.g. `EDGE`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, &process_env)
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_vars(profile: &str, vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(profile, &|k: &str| vars.get(k).cloned())
    }

    fn from_lookup(profile: &str, lookup: Lookup<'_>) -> Self {
        let p = profile.trim().to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            source: SourceConfig::from_lookup(lookup, p),
            state: StateConfig::from_lookup(lookup, p),
            notify: NotifyConfig::from_lookup(lookup, p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check values that would make every run fail.
    pub fn validate(&self) -> Result<(), NatwatchError> {
        if self.source.command.is_empty() {
            return Err(NatwatchError::Config("source command is empty".to_string()));
        }
        if self.source.timeout_secs == 0 {
            return Err(NatwatchError::Config("source timeout must be positive".to_string()));
        }
        if self.notify.timeout_secs == 0 {
            return Err(NatwatchError::Config("webhook timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  source:  command={:?}, timeout={}s",
            self.source.command,
            self.source.timeout_secs
        );
        tracing::info!("  state:   file={}", self.state.state_file.display());
        tracing::info!(
            "  notify:  webhook={}, timeout={}s",
            self.notify.redacted_url(),
            self.notify.timeout_secs
        );
    }
}

// ── Rule source ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Program followed by its arguments. Never passed through a shell.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl SourceConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        let raw = profiled_or(lookup, p, "NATWATCH_SOURCE_COMMAND", DEFAULT_SOURCE_COMMAND);
        Self {
            command: raw.split_whitespace().map(str::to_string).collect(),
            timeout_secs: profiled_u64(lookup, p, "NATWATCH_SOURCE_TIMEOUT_SECS", 30),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── State file ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub state_file: PathBuf,
}

impl StateConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        Self {
            state_file: PathBuf::from(profiled_or(lookup, p, "NATWATCH_STATE_FILE", DEFAULT_STATE_FILE)),
        }
    }
}

// ── Notification endpoint ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint. `None` means messages are only logged locally.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl NotifyConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        let webhook_url = profiled_opt(lookup, p, "NATWATCH_WEBHOOK_URL")
            .or_else(|| profiled_opt(lookup, p, "DISCORD_WEBHOOK_URL"))
            .map(|u| u.trim().to_string());
        Self {
            webhook_url,
            timeout_secs: profiled_u64(lookup, p, "NATWATCH_WEBHOOK_TIMEOUT_SECS", 10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Webhook URLs embed their token in the path, so only the scheme and
    /// host are ever logged.
    pub fn redacted_url(&self) -> String {
        match &self.webhook_url {
            None => "(none)".to_string(),
            Some(url) => {
                let (scheme, rest) = url.split_once("://").unwrap_or(("", url.as_str()));
                let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
                if scheme.is_empty() {
                    format!("{host}/***")
                } else {
                    format!("{scheme}://{host}/***")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_vars("", &HashMap::new());
        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.source.command, vec!["iptables-save", "-t", "nat"]);
        assert_eq!(cfg.source.timeout_secs, 30);
        assert_eq!(cfg.state.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert!(cfg.notify.webhook_url.is_none());
        assert_eq!(cfg.notify.timeout(), Duration::from_secs(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn explicit_values() {
        let cfg = Config::from_vars(
            "",
            &vars(&[
                ("NATWATCH_SOURCE_COMMAND", "nft  list table ip nat"),
                ("NATWATCH_SOURCE_TIMEOUT_SECS", "5"),
                ("NATWATCH_STATE_FILE", "/tmp/nat/state.json"),
                ("NATWATCH_WEBHOOK_URL", " https://hooks.example.com/abc "),
                ("NATWATCH_WEBHOOK_TIMEOUT_SECS", "3"),
            ]),
        );
        assert_eq!(cfg.source.command, vec!["nft", "list", "table", "ip", "nat"]);
        assert_eq!(cfg.source.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.state.state_file, PathBuf::from("/tmp/nat/state.json"));
        assert_eq!(cfg.notify.webhook_url.as_deref(), Some("https://hooks.example.com/abc"));
        assert_eq!(cfg.notify.timeout_secs, 3);
    }

    #[test]
    fn profile_prefix_wins_over_plain_key() {
        let cfg = Config::from_vars(
            "edge",
            &vars(&[
                ("NATWATCH_STATE_FILE", "/plain.json"),
                ("EDGE_NATWATCH_STATE_FILE", "/edge.json"),
                ("NATWATCH_SOURCE_TIMEOUT_SECS", "7"),
            ]),
        );
        assert_eq!(cfg.profile_label(), "EDGE");
        assert_eq!(cfg.state.state_file, PathBuf::from("/edge.json"));
        // Falls back to the unprefixed key.
        assert_eq!(cfg.source.timeout_secs, 7);
    }

    #[test]
    fn discord_url_is_a_fallback() {
        let cfg = Config::from_vars("", &vars(&[("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/t")]));
        assert!(cfg.notify.is_configured());

        let cfg = Config::from_vars(
            "",
            &vars(&[
                ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/t"),
                ("NATWATCH_WEBHOOK_URL", "https://other.example.com/hook"),
            ]),
        );
        assert_eq!(cfg.notify.webhook_url.as_deref(), Some("https://other.example.com/hook"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = Config::from_vars("", &vars(&[("NATWATCH_WEBHOOK_URL", "   ")]));
        assert!(!cfg.notify.is_configured());
    }

    #[test]
    fn bad_number_falls_back_to_default() {
        let cfg = Config::from_vars("", &vars(&[("NATWATCH_SOURCE_TIMEOUT_SECS", "soon")]));
        assert_eq!(cfg.source.timeout_secs, 30);
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config::from_vars("", &vars(&[("NATWATCH_WEBHOOK_TIMEOUT_SECS", "0")]));
        assert!(matches!(cfg.validate(), Err(NatwatchError::Config(_))));
    }

    #[test]
    fn redacted_url_hides_token() {
        let cfg = Config::from_vars(
            "",
            &vars(&[("NATWATCH_WEBHOOK_URL", "https://discord.com/api/webhooks/123/secret-token")]),
        );
        let shown = cfg.notify.redacted_url();
        assert_eq!(shown, "https://discord.com/***");
        assert!(!shown.contains("secret-token"));
    }
}
