//! Outbound mail transport.
//!
//! The transport is a black box behind [`Mailer`]. Delivery errors are reported
//! to the caller, which decides whether to swallow them ([`send_quietly`]).

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Single line.
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport unavailable: {0}")]
    Transport(String),

    #[error("Recipient rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Sends with fail-silently semantics: failures are neither retried nor
/// surfaced. Returns whether the transport accepted the message.
pub async fn send_quietly(mailer: &dyn Mailer, mail: OutgoingMail) -> bool {
    match mailer.send_mail(mail).await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Mail delivery failed, ignoring");
            false
        }
    }
}

/// Delivers through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let builder = match config.smtp_security.as_str() {
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?,
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
            other => return Err(anyhow::anyhow!("Unknown SMTP security mode: {}", other)),
        };
        let mut builder = builder.port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::Rejected(format!("{}: {}", address, e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(mailbox(&mail.from)?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &mail.to {
            builder = builder.to(mailbox(to)?);
        }
        let message = builder
            .body(mail.body)
            .map_err(|e| MailError::Transport(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Writes every message to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            from = %mail.from,
            to = ?mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Outgoing mail"
        );
        Ok(())
    }
}

/// Keeps messages in memory. Clones share the same outbox.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Messages addressed to `address`.
    pub fn sent_to(&self, address: &str) -> Vec<OutgoingMail> {
        self.sent()
            .into_iter()
            .filter(|mail| mail.to.iter().any(|to| to == address))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.clear();
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?;
        outbox.push(mail);
        Ok(())
    }
}

pub fn make_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.mail_backend.as_str() {
        "smtp" => {
            let mailer = SmtpMailer::from_config(config)?;
            info!(
                host = %config.smtp_host,
                port = config.smtp_port,
                security = %config.smtp_security,
                "Using SMTP mail backend"
            );
            Ok(Arc::new(mailer))
        }
        "log" => Ok(Arc::new(LogMailer)),
        "memory" => {
            info!("Using in-memory mail backend, nothing will be delivered");
            Ok(Arc::new(MemoryMailer::new()))
        }
        other => Err(anyhow::anyhow!("Unknown mail backend: {}", other)),
    }
}
