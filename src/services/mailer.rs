// SPDX-License-Identifier: MIT

//! Outbound email through a REST mail provider.
//!
//! Delivery is best-effort everywhere this is called from: the accrual job
//! logs failures and moves on, and no committed state depends on a send
//! succeeding.

use crate::error::AppError;

/// Mail delivery client.
#[derive(Clone)]
pub struct MailerService {
    http: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
    from: String,
}

impl MailerService {
    /// Create a new mailer client.
    pub fn new(base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }

    /// Create a mock mailer for testing (offline mode). Sends are no-ops.
    pub fn new_mock() -> Self {
        Self {
            http: None,
            base_url: String::new(),
            api_key: String::new(),
            from: "test@nxo-mining.app".to_string(),
        }
    }

    /// Send the "mining session ended" notification.
    pub async fn send_session_ended(&self, to: &str) -> Result<(), AppError> {
        let Some(http) = self.http.as_ref() else {
            tracing::debug!(to, "Mock mailer: skipping session-ended email");
            return Ok(());
        };

        let url = format!("{}/messages", self.base_url);
        let body = serde_json::json!({
            "from": self.from,
            "to": to,
            "subject": "Mining session ended",
            "text": "Your mining session is over. Collect your NXO and start a new one!",
        });

        let response = http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MailApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MailApi(format!("HTTP {}: {}", status, body)));
        }

        tracing::info!(to, "Session-ended email sent");
        Ok(())
    }
}
