//! Notification channel adapters.

pub mod log;
pub mod webhook;

pub use log::LogNotifier;
pub use webhook::{WebhookNotifier, WebhookPayload};

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::NotificationConfig;
use crate::domain::ports::Notifier;

/// Build the notifier selected by configuration.
///
/// A configured webhook URL selects [`WebhookNotifier`]; otherwise
/// notifications only reach the log.
pub fn from_config(config: &NotificationConfig) -> DomainResult<Arc<dyn Notifier>> {
    match config.webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            Ok(Arc::new(WebhookNotifier::new(url, config.timeout_secs)?))
        }
        _ => Ok(Arc::new(LogNotifier)),
    }
}
