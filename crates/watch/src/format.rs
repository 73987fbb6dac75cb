//! Message rendering for chat-style webhooks.
//!
//! Rules are wrapped in inline code blocks so the channel does not apply
//! markdown to them, and the unified diff is capped so the whole message
//! stays within the channel's size limit.

use chrono::{DateTime, SecondsFormat, Utc};

use natwatch_core::{NatwatchError, RuleLine};

use crate::diff::{unified_diff, DiffResult};

/// Sentinel summary when nothing was added or removed.
pub const NO_CHANGE: &str = "No change in NAT table";
/// Longest unified diff text kept in a message, in characters.
pub const MAX_DIFF_CHARS: usize = 1000;
pub const TRUNCATION_MARKER: &str = "\n...(diff truncated)";

pub const ADDED_HEADER: &str = "[+] Added rules";
pub const REMOVED_HEADER: &str = "[-] Removed rules";

/// Added and removed sections, one code block per rule.
pub fn format_summary(diff: &DiffResult) -> String {
    let mut lines = Vec::new();
    push_section(&mut lines, ADDED_HEADER, &diff.added);
    push_section(&mut lines, REMOVED_HEADER, &diff.removed);

    if lines.is_empty() {
        return NO_CHANGE.to_string();
    }
    lines.join("\n")
}

fn push_section(lines: &mut Vec<String>, header: &str, rules: &[RuleLine]) {
    if rules.is_empty() {
        return;
    }
    lines.push(header.to_string());
    lines.extend(rules.iter().map(|r| format!("```{r}```")));
}

/// Unified diff as a fenced `diff` block, empty when nothing changed.
pub fn format_unified(old: &[RuleLine], new: &[RuleLine]) -> String {
    let diff = unified_diff(old, new);
    if diff.is_empty() {
        return String::new();
    }
    let text = truncate_diff(&diff.join("\n"));
    format!("```diff\n{text}\n```")
}

/// Keep at most [`MAX_DIFF_CHARS`] characters, marking any cut.
pub fn truncate_diff(text: &str) -> String {
    match text.char_indices().nth(MAX_DIFF_CHARS) {
        Some((idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Full change message: timestamp header, summary and, when present, the
/// fenced unified diff.
pub fn compose_change_message(at: DateTime<Utc>, summary: &str, unified: &str) -> String {
    let mut parts = vec![
        format!(
            "**NAT table change detected at** {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        String::new(),
        summary.to_string(),
    ];
    if !unified.is_empty() {
        parts.push("\n**Full diff:**".to_string());
        parts.push(unified.to_string());
    }
    parts.join("\n")
}

/// Alert sent when the rules could not be captured.
pub fn format_capture_error(err: &NatwatchError) -> String {
    match err {
        NatwatchError::SourceUnavailable(detail) => format!("NAT rule capture failed: {detail}"),
        other => format!("NAT rule capture failed: {other}"),
    }
}
