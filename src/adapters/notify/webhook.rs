//! Webhook notifier.
//!
//! POSTs one JSON document per addressed agent. Non-2xx responses and
//! transport errors surface as `NotificationFailed`; the dispatcher logs them.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{LeadSummary, Notifier};

/// Body sent to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub user_id: String,
    #[serde(flatten)]
    pub lead: LeadSummary,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ValidationFailed(format!("webhook client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: &str, summary: &LeadSummary) -> DomainResult<()> {
        let payload = WebhookPayload {
            user_id: user_id.to_string(),
            lead: summary.clone(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DomainError::NotificationFailed {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(user_id = %user_id, status = %status, "Webhook notification sent");
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(user_id = %user_id, status = %status, response_body = %body, "Webhook rejected notification");

        Err(DomainError::NotificationFailed {
            user_id: user_id.to_string(),
            reason: format!("status {status}: {body}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::{Matcher, Server};
    use uuid::Uuid;

    fn summary() -> LeadSummary {
        LeadSummary {
            cliente_id: Uuid::new_v4(),
            lead_id: Uuid::new_v4(),
            nome: "Maria".to_string(),
            telefone: Some("+55 11 98888-7777".to_string()),
            source: "site".to_string(),
            sequencia: 1,
            expira_em: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/leads")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "user_id": "ana",
                "nome": "Maria",
                "sequencia": 1
            })))
            .with_status(204)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hooks/leads", server.url()), 5).unwrap();
        notifier.notify("ana", &summary()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_notification_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(503)
            .with_body("down")
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(server.url(), 5).unwrap();
        let err = notifier.notify("ana", &summary()).await.unwrap_err();
        match err {
            DomainError::NotificationFailed { user_id, reason } => {
                assert_eq!(user_id, "ana");
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
