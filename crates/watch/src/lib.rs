//! NAT table change watcher.
//!
//! One pass of the pipeline captures the current NAT rules, compares them
//! with the snapshot persisted by the previous pass, reports any change and
//! persists the new snapshot:
//! - `source`: runs the rule dump command and normalizes its output
//! - `store`: JSON snapshot file, tolerant of a missing or corrupt file
//! - `diff`: set diff and unified line diff
//! - `format`: message rendering bounded for chat webhooks
//! - `pipeline`: sequencing and partial-failure handling

pub mod diff;
pub mod format;
pub mod pipeline;
pub mod source;
pub mod store;

pub use diff::{set_diff, unified_diff, DiffResult};
pub use pipeline::{Pipeline, RunReport, RunState};
pub use source::{CommandSource, RuleSource};
pub use store::{PersistedState, SnapshotStore};
