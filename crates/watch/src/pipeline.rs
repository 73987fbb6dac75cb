//! One capture → compare → report → persist pass.
//!
//! Only a failed capture stops a run early. A corrupt baseline, a failed
//! notification or a failed save are logged and the run carries on.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use natwatch_core::Config;
use natwatch_notify::{build_notifier, deliver, DeliveryOutcome, Notifier};

use crate::diff::{set_diff, DiffResult};
use crate::format::{compose_change_message, format_capture_error, format_summary, format_unified};
use crate::source::{CommandSource, RuleSource};
use crate::store::SnapshotStore;

/// Pipeline states. `Aborted` is reachable only from `Capturing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Capturing,
    Comparing,
    Reporting,
    Persisting,
    Done,
    Aborted,
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub final_state: RunState,
    /// `None` when the run aborted before comparing.
    pub diff: Option<DiffResult>,
    /// Set when a notification was attempted (change report or capture alert).
    pub notification: Option<DeliveryOutcome>,
    pub persisted: bool,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.diff.as_ref().is_some_and(|d| !d.is_empty())
    }
}

pub struct Pipeline {
    source: Box<dyn RuleSource>,
    store: SnapshotStore,
    notifier: Box<dyn Notifier>,
}

impl Pipeline {
    pub fn new(source: Box<dyn RuleSource>, store: SnapshotStore, notifier: Box<dyn Notifier>) -> Self {
        Self {
            source,
            store,
            notifier,
        }
    }

    /// Wire up the command source, state file and notification channel
    /// described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(CommandSource::from_config(&config.source)),
            SnapshotStore::new(&config.state.state_file),
            build_notifier(&config.notify),
        )
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// Run one pass, stamping any change message with `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let mut state = RunState::Idle;

        advance(&mut state, RunState::Capturing);
        let current = match self.source.capture().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "rule capture failed, aborting run");
                advance(&mut state, RunState::Aborted);
                let outcome = deliver(self.notifier(), &format_capture_error(&e)).await;
                return RunReport {
                    final_state: state,
                    diff: None,
                    notification: Some(outcome),
                    persisted: false,
                };
            }
        };

        advance(&mut state, RunState::Comparing);
        let previous = self.store.load();
        let diff = set_diff(&previous, &current.rules);

        let notification = if diff.is_empty() {
            info!(at = %now, rules = current.len(), "No NAT changes detected");
            None
        } else {
            advance(&mut state, RunState::Reporting);
            info!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                "NAT table change detected"
            );
            let summary = format_summary(&diff);
            let unified = format_unified(&previous, &current.rules);
            let message = compose_change_message(now, &summary, &unified);
            Some(deliver(self.notifier(), &message).await)
        };

        advance(&mut state, RunState::Persisting);
        let persisted = match self.store.save(&current) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to save snapshot, next run compares against the old baseline");
                false
            }
        };

        advance(&mut state, RunState::Done);
        RunReport {
            final_state: state,
            diff: Some(diff),
            notification,
            persisted,
        }
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!(from = ?state, to = ?next, "pipeline state");
    *state = next;
}
