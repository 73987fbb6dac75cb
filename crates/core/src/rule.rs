use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NatwatchError;

/// Prefix marking a comment line in rule source output.
pub const COMMENT_MARKER: char = '#';

/// One NAT rule as printed by the rule source, treated as an opaque string.
///
/// Always trimmed, non-empty and not a comment, including when read back
/// from JSON. Equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleLine(String);

impl RuleLine {
    /// Normalize a raw line. Returns `None` for blank and comment lines.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RuleLine {
    type Error = NatwatchError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
            .ok_or_else(|| NatwatchError::StateCorrupt(format!("not a rule line: {raw:?}")))
    }
}

impl From<RuleLine> for String {
    fn from(rule: RuleLine) -> Self {
        rule.0
    }
}

impl fmt::Display for RuleLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RuleLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split rule source output into rule lines, preserving order.
pub fn parse_rule_lines(output: &str) -> Vec<RuleLine> {
    output.lines().filter_map(RuleLine::parse).collect()
}

/// The complete ordered rule set captured at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSnapshot {
    pub rules: Vec<RuleLine>,
    pub captured_at: DateTime<Utc>,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<RuleLine>, captured_at: DateTime<Utc>) -> Self {
        Self { rules, captured_at }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
