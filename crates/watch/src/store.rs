use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use natwatch_core::{NatwatchError, RuleLine, RuleSnapshot};

/// On-disk form of the most recent snapshot.
///
/// ```text
/// {
///     "rules": ["*nat", ":PREROUTING ACCEPT [0:0]", ...],
///     "saved_at": "2026-10-16T08:00:00.123456Z"
/// }
/// ```
///
/// Fields are declared in key order so the file is written with sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub rules: Vec<RuleLine>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl From<&RuleSnapshot> for PersistedState {
    fn from(snapshot: &RuleSnapshot) -> Self {
        Self {
            rules: snapshot.rules.clone(),
            saved_at: Some(snapshot.captured_at),
        }
    }
}

/// Filesystem-backed persistence of the last captured snapshot.
///
/// Holds no state between calls; every load re-reads the file. Assumes a
/// single writer.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state.
    ///
    /// `Ok(None)` when the file does not exist; [`NatwatchError::StateCorrupt`]
    /// when it cannot be read or does not parse.
    pub fn load_state(&self) -> Result<Option<PersistedState>, NatwatchError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(NatwatchError::StateCorrupt(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };
        let state = serde_json::from_str(&json).map_err(|e| {
            NatwatchError::StateCorrupt(format!("cannot parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(state))
    }

    /// Previous rule sequence, or empty when there is no usable baseline.
    ///
    /// A corrupt file makes every current rule show up as added on this run;
    /// the following save repairs the file.
    pub fn load(&self) -> Vec<RuleLine> {
        match self.load_state() {
            Ok(Some(state)) => {
                debug!(path = %self.path.display(), rules = state.rules.len(), "previous snapshot loaded");
                state.rules
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "no previous snapshot, starting from empty baseline");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unusable state file");
                Vec::new()
            }
        }
    }

    /// Overwrite the state file with `snapshot`, creating its directory if
    /// needed.
    pub fn save(&self, snapshot: &RuleSnapshot) -> Result<(), NatwatchError> {
        let persist_err =
            |e: std::io::Error| NatwatchError::PersistFailure(format!("{}: {e}", self.path.display()));

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(persist_err)?;
        }

        let json = render_state(&PersistedState::from(snapshot))
            .map_err(|e| NatwatchError::PersistFailure(format!("cannot serialize state: {e}")))?;
        std::fs::write(&self.path, json).map_err(persist_err)?;

        debug!(path = %self.path.display(), rules = snapshot.len(), "snapshot saved");
        Ok(())
    }
}

/// Pretty JSON with four-space indentation.
fn render_state(state: &PersistedState) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    state.serialize(&mut ser)?;
    Ok(buf)
}
