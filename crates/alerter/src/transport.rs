use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

use crate::error::AlerterError;

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &[String], subject: &str, html_body: &str) -> Result<(), AlerterError>;
}

/// `lettre`-backed transport, configured from `GMAIL_USER`/`GMAIL_APP_PASSWORD`.
pub struct LettreEmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl LettreEmailTransport {
    pub fn new(gmail_user: String, gmail_app_password: String) -> Result<Self, AlerterError> {
        let creds = Credentials::new(gmail_user.clone(), gmail_app_password);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay("smtp.gmail.com")
            .map_err(|err| AlerterError::Smtp(err.to_string()))?
            .credentials(creds)
            .build();
        Ok(Self { mailer, from: gmail_user })
    }
}

#[async_trait]
impl EmailTransport for LettreEmailTransport {
    async fn send(&self, to: &[String], subject: &str, html_body: &str) -> Result<(), AlerterError> {
        for recipient in to {
            let message = Message::builder()
                .from(self.from.parse().map_err(|_| AlerterError::InvalidAddress(self.from.clone()))?)
                .to(recipient
                    .parse()
                    .map_err(|_| AlerterError::InvalidAddress(recipient.clone()))?)
                .subject(subject)
                .header(ContentType::TEXT_HTML)
                .body(html_body.to_string())
                .map_err(|err| AlerterError::Smtp(err.to_string()))?;

            self.mailer
                .send(message)
                .await
                .map_err(|err| AlerterError::Smtp(err.to_string()))?;
        }
        Ok(())
    }
}

/// Used when `GMAIL_USER`/`GMAIL_APP_PASSWORD` are absent: the alerter
/// still runs and logs what it would have sent, but never dials SMTP.
pub struct NoopEmailTransport;

#[async_trait]
impl EmailTransport for NoopEmailTransport {
    async fn send(&self, to: &[String], subject: &str, _html_body: &str) -> Result<(), AlerterError> {
        warn!(?to, subject, "alerting not configured, dropping email");
        Ok(())
    }
}
