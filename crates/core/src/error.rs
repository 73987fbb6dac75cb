use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NatwatchError {
    /// The rule source command could not be run or exited unsuccessfully.
    #[error("rule source unavailable: {0}")]
    SourceUnavailable(String),

    /// Persisted state exists but could not be read or parsed.
    #[error("persisted state corrupt: {0}")]
    StateCorrupt(String),

    /// The current snapshot could not be written.
    #[error("failed to persist snapshot: {0}")]
    PersistFailure(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
