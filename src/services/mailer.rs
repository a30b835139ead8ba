use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct OutboundMail<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Client for the internal mail relay that delivers threshold alerts.
/// Delivery itself (SMTP, templating) lives in the relay; this side only
/// posts one message per alert.
pub struct MailRelayClient {
    http_client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl MailRelayClient {
    /// Builds a client when a relay URL is configured, `None` otherwise.
    /// Alerting is optional; without a relay the ingest path still works.
    #[must_use]
    pub fn new(config: &Config) -> Option<Self> {
        let base_url = config.mail_relay_url.clone()?;

        let http_client = Client::builder()
            .danger_accept_invalid_certs(config.mail_skip_tls_verify)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Some(Self {
            http_client,
            base_url,
            bearer_token: config.mail_relay_token.clone(),
        })
    }

    /// Sends one message through the relay.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MailRelay` if the request fails or the relay
    /// answers with an error status.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let url = format!("{}/send", self.base_url);

        let mut request = self
            .http_client
            .post(&url)
            .json(&OutboundMail { to, subject, body });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::MailRelay(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::MailRelay(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        Ok(())
    }
}
