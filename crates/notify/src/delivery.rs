//! Channel selection and best-effort delivery.
//!
//! Delivery never fails the caller: errors are logged and reported in the
//! returned [`DeliveryOutcome`], and nothing is retried.

use natwatch_core::config::NotifyConfig;

use crate::local::LogNotifier;
use crate::traits::{DeliveryOutcome, Notifier};
use crate::webhook::WebhookNotifier;

/// Pick the channel for this process.
///
/// Without a webhook URL, or with one that fails validation, messages go
/// to the local log.
pub fn build_notifier(config: &NotifyConfig) -> Box<dyn Notifier> {
    let Some(raw_url) = config.webhook_url.as_deref() else {
        tracing::info!("no webhook URL configured, notifications will be logged locally");
        return Box::new(LogNotifier::new());
    };

    match WebhookNotifier::from_config(raw_url, config.timeout()) {
        Ok(notifier) => Box::new(notifier),
        Err(e) => {
            tracing::warn!(
                webhook = %config.redacted_url(),
                error = %e,
                "webhook unusable, falling back to local logging"
            );
            Box::new(LogNotifier::new())
        }
    }
}

/// Send `message` once through `notifier`, absorbing any failure.
pub async fn deliver(notifier: &dyn Notifier, message: &str) -> DeliveryOutcome {
    let start = std::time::Instant::now();
    let result = notifier.send(message).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    let channel = notifier.channel_name();

    let (success, error) = match result {
        Ok(()) => {
            tracing::info!(channel, duration_ms, "Notification delivered");
            (true, None)
        }
        Err(e) => {
            tracing::warn!(channel, error = %e, duration_ms, "Notification delivery failed");
            (false, Some(e.to_string()))
        }
    };

    DeliveryOutcome {
        channel: channel.to_string(),
        success,
        error,
        duration_ms,
    }
}
