//! Local fallback channel: writes messages to the log instead of sending them.

use crate::traits::{Notifier, NotifyError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        tracing::info!("no webhook configured, message would have been:\n{message}");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
