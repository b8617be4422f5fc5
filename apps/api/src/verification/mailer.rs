//! Outbound mail. Delivery is a single attempt; failures surface to the
//! caller as [`DeliveryError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub const VERIFICATION_SUBJECT: &str = "ABUCONS CV Submission Verification";

pub fn verification_body(code: &str) -> String {
    format!("Your verification code is: {code}")
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Writes messages to the log instead of sending them. The body is only
/// emitted at `debug`.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        info!("Mail from {} to {to}: {subject}", self.from);
        debug!("Mail body: {body}");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Posts each message as JSON to an HTTP mail relay.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    relay_url: String,
    token: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(relay_url: String, token: Option<String>, from: String) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            relay_url,
            token,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = RelayMessage {
            from: &self.from,
            to,
            subject,
            text: body,
        };

        let mut request = self.client.post(&self.relay_url).json(&message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        info!("Relay accepted mail to {to}");
        Ok(())
    }
}
