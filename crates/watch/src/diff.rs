//! Rule set comparison.
//!
//! [`set_diff`] answers *what* changed, ignoring order and duplicates.
//! [`unified_diff`] answers *where*: NAT rules are evaluated in order, so a
//! reordering matters even when the same rules are present.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use similar::{capture_diff_slices_deadline, group_diff_ops, Algorithm, DiffTag};

use natwatch_core::RuleLine;

/// Lines of unchanged context around each change.
pub const CONTEXT_LINES: usize = 3;

/// Past this, the remaining difference is reported as one replaced block
/// instead of being aligned line by line.
const DIFF_DEADLINE: Duration = Duration::from_secs(5);

/// Rules added and removed between two snapshots, each sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub added: Vec<RuleLine>,
    pub removed: Vec<RuleLine>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// `added = new − old`, `removed = old − new`.
pub fn set_diff(old: &[RuleLine], new: &[RuleLine]) -> DiffResult {
    let old_set: BTreeSet<&RuleLine> = old.iter().collect();
    let new_set: BTreeSet<&RuleLine> = new.iter().collect();

    DiffResult {
        added: new_set.difference(&old_set).map(|r| (*r).clone()).collect(),
        removed: old_set.difference(&new_set).map(|r| (*r).clone()).collect(),
    }
}

/// Unified diff of `old` against `new`, labeled `before`/`after`.
///
/// Lines are aligned with Myers' algorithm, so time and memory grow with
/// the table size times the number of edits rather than with the square of
/// the table size. Empty when the sequences are identical.
pub fn unified_diff(old: &[RuleLine], new: &[RuleLine]) -> Vec<String> {
    if old == new {
        return Vec::new();
    }

    let ops = capture_diff_slices_deadline(
        Algorithm::Myers,
        old,
        new,
        Some(Instant::now() + DIFF_DEADLINE),
    );

    let mut lines = vec!["--- before".to_string(), "+++ after".to_string()];
    for group in group_diff_ops(ops, CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        lines.push(format!(
            "@@ -{} +{} @@",
            format_range(first.old_range().start, last.old_range().end),
            format_range(first.new_range().start, last.new_range().end)
        ));
        for op in &group {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    lines.extend(old[old_range].iter().map(|r| format!(" {r}")));
                }
                DiffTag::Delete => {
                    lines.extend(old[old_range].iter().map(|r| format!("-{r}")));
                }
                DiffTag::Insert => {
                    lines.extend(new[new_range].iter().map(|r| format!("+{r}")));
                }
                DiffTag::Replace => {
                    lines.extend(old[old_range].iter().map(|r| format!("-{r}")));
                    lines.extend(new[new_range].iter().map(|r| format!("+{r}")));
                }
            }
        }
    }
    lines
}

/// `start,length` with 1-based start; a single line omits the length and an
/// empty range points at the line before it.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        1 => format!("{}", start + 1),
        0 => format!("{start},0"),
        _ => format!("{},{length}", start + 1),
    }
}
