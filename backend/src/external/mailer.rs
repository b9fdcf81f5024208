//! Transactional email client
//!
//! Posts outgoing notification emails to an HTTP email-delivery API.
//! Delivery is best-effort: callers queue notifications first and only
//! mark them sent on success.

use reqwest::Client;
use serde::Serialize;

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

/// Email delivery client
#[derive(Clone)]
pub struct MailerClient {
    client: Client,
    api_endpoint: String,
    api_token: String,
    from_address: String,
}

/// Outgoing email payload
#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl MailerClient {
    /// Build a client from configuration. Returns `None` when the email
    /// service is not configured, in which case notifications stay queued.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        if config.api_endpoint.is_empty() || config.api_token.is_empty() {
            return None;
        }

        Some(Self {
            client: Client::new(),
            api_endpoint: config.api_endpoint.clone(),
            api_token: config.api_token.clone(),
            from_address: config.from_address.clone(),
        })
    }

    /// Send a single email
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let payload = OutgoingEmail {
            from: &self.from_address,
            to,
            subject,
            text: body,
        };

        let response = self
            .client
            .post(&self.api_endpoint)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("email delivery failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "email API returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
