//! Post-commit notification delivery.
//!
//! The controller enqueues requests after its transaction commits; a single
//! worker drains the queue and calls the [`Notifier`]. Delivery is best
//! effort: a full or closed queue drops the request with a warning and a
//! notifier error is logged, never retried.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::ports::{LeadSummary, Notifier};

/// One agent to tell about one lead.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub user_id: String,
    pub summary: LeadSummary,
}

/// Delivery counters returned when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Sending side of the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<NotificationRequest>,
}

impl NotificationDispatcher {
    /// Spawn the delivery worker.
    ///
    /// The worker exits once every dispatcher clone is dropped and the queue
    /// is empty; await the handle to drain pending notifications.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<DispatchStats>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(notifier, rx));
        (Self { tx }, worker)
    }

    /// Enqueue a request without waiting. Returns whether it was accepted.
    pub fn dispatch(&self, request: NotificationRequest) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(request)) => {
                warn!(
                    user_id = %request.user_id,
                    cliente_id = %request.summary.cliente_id,
                    "Notification queue full, dropping notification"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(request)) => {
                warn!(
                    user_id = %request.user_id,
                    cliente_id = %request.summary.cliente_id,
                    "Notification worker stopped, dropping notification"
                );
                false
            }
        }
    }
}

async fn run_worker(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::Receiver<NotificationRequest>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();

    while let Some(request) = rx.recv().await {
        match notifier.notify(&request.user_id, &request.summary).await {
            Ok(()) => {
                stats.delivered += 1;
                debug!(user_id = %request.user_id, tier = request.summary.sequencia, "Notification delivered");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(
                    user_id = %request.user_id,
                    cliente_id = %request.summary.cliente_id,
                    error = %e,
                    "Notification failed"
                );
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, user_id: &str, _summary: &LeadSummary) -> DomainResult<()> {
            if user_id == "offline" {
                return Err(DomainError::NotificationFailed {
                    user_id: user_id.to_string(),
                    reason: "unreachable".to_string(),
                });
            }
            self.seen.lock().unwrap().push(user_id.to_string());
            Ok(())
        }
    }

    fn request(user_id: &str) -> NotificationRequest {
        NotificationRequest {
            user_id: user_id.to_string(),
            summary: LeadSummary {
                cliente_id: Uuid::new_v4(),
                lead_id: Uuid::new_v4(),
                nome: "Maria".to_string(),
                telefone: None,
                source: "site".to_string(),
                sequencia: 1,
                expira_em: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_worker_drains_and_counts_failures() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, worker) = NotificationDispatcher::spawn(notifier.clone(), 8);

        assert!(dispatcher.dispatch(request("ana")));
        assert!(dispatcher.dispatch(request("offline")));
        assert!(dispatcher.dispatch(request("bruno")));
        drop(dispatcher);

        let stats = worker.await.unwrap();
        assert_eq!(stats, DispatchStats { delivered: 2, failed: 1 });
        assert_eq!(*notifier.seen.lock().unwrap(), vec!["ana".to_string(), "bruno".to_string()]);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, worker) = NotificationDispatcher::spawn(notifier, 1);
        worker.abort();
        let _ = worker.await;
        assert!(!dispatcher.dispatch(request("ana")));
    }
}
