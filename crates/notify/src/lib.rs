//! Change notification delivery.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - `WebhookNotifier` posting `{"content": ...}` JSON to an HTTP endpoint
//! - `LogNotifier`, the local fallback when no endpoint is configured
//! - `deliver`, the best-effort wrapper the pipeline calls

pub mod delivery;
pub mod local;
pub mod traits;
pub mod webhook;

pub use delivery::{build_notifier, deliver};
pub use local::LogNotifier;
pub use traits::{DeliveryOutcome, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
