use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email side channel. Delivery mechanics live behind this seam;
/// a send failure must surface to the caller, never be swallowed.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends mail through an HTTP relay (any Mailgun-style JSON endpoint).
pub struct RelayMailer {
    client: reqwest::Client,
    relay_url: String,
    from_address: String,
}

impl RelayMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent("Ratarr/1.0")
            .build()
            .context("failed to build mail relay HTTP client")?;

        Ok(Self {
            client,
            relay_url: config.relay_url.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let payload = RelayPayload {
            from: &self.from_address,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
        };

        self.client
            .post(&self.relay_url)
            .json(&payload)
            .send()
            .await
            .context("mail relay unreachable")?
            .error_for_status()
            .context("mail relay rejected the message")?;

        info!("Sent mail to {}: {}", email.to, email.subject);
        Ok(())
    }
}

/// Writes outbound mail to the log instead of delivering it. Used when no
/// relay is configured, e.g. local development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        info!(
            "Mail relay not configured, logging instead. to={} subject={:?} body={:?}",
            email.to, email.subject, email.body
        );
        Ok(())
    }
}

/// Collects outbound mail in memory so tests can read issued codes back.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(email.clone());
        Ok(())
    }
}
