//! Outbound mail.
//!
//! The manager talks to the [`Mailer`] trait; production wires in
//! [`SmtpMailer`], tests substitute a recording stub. Failures map to
//! 503 at the HTTP boundary, with permanent SMTP rejections reported
//! without retrying.

use async_trait::async_trait;
use coefin_core::settings::MailSettings;
use coefin_core::PublicError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail service is unreachable: {0}")]
    Connection(String),

    #[error("mail request was rejected: {0}")]
    Response(String),
}

impl MailError {
    pub fn to_public(&self) -> PublicError {
        PublicError::new(
            "Mail service is unavailable.",
            [
                "Try later.".to_owned(),
                "Contact with Support.".to_owned(),
            ],
        )
    }
}

/// Sends plain-text mail on behalf of the system address.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, text: &str) -> Result<(), MailError>;
}

/// SMTP-backed mailer with a connection retry budget.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    retries: u32,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings, sys_email: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| MailError::Connection(e.to_string()))?
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        let sender = sys_email
            .parse()
            .map_err(|_| MailError::Response(format!("invalid sender address: {sys_email}")))?;

        Ok(Self {
            transport,
            sender,
            retries: settings.retries,
        })
    }

    fn build(&self, recipient: &str, subject: &str, text: &str) -> Result<Message, MailError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| MailError::Response(format!("invalid recipient address: {recipient}")))?;

        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_owned())
            .map_err(|e| MailError::Response(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, text: &str) -> Result<(), MailError> {
        let message = self.build(recipient, subject, text)?;

        let attempts = self.retries.max(1);
        let mut last = None;
        for attempt in 1..=attempts {
            match self.transport.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(err) if err.is_permanent() => {
                    return Err(MailError::Response(err.to_string()));
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "smtp delivery failed, retrying");
                    last = Some(err);
                }
            }
        }

        // Retries exhausted. Transient SMTP codes are still a server
        // response; everything else looks like a broken connection.
        let err = last.ok_or_else(|| MailError::Connection("no attempts made".to_owned()))?;
        if err.is_transient() {
            Err(MailError::Response(err.to_string()))
        } else {
            Err(MailError::Connection(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(
            &MailSettings {
                host: "smtp.coefin.dev".into(),
                user: "svc".into(),
                password: "s3cret".into(),
                timeout: Duration::from_secs(1),
                retries: 2,
            },
            "noreply@coefin.dev",
        )
        .expect("mailer construction failed")
    }

    #[test]
    fn bad_recipient_is_a_response_error() {
        let err = mailer()
            .build("definitely not an address", "subject", "text")
            .expect_err("build should fail");
        assert!(matches!(err, MailError::Response(_)));
    }

    #[test]
    fn bad_sender_fails_construction() {
        let result = SmtpMailer::new(
            &MailSettings {
                host: "smtp.coefin.dev".into(),
                user: "svc".into(),
                password: "s3cret".into(),
                timeout: Duration::from_secs(1),
                retries: 2,
            },
            "broken sender",
        );
        assert!(result.is_err());
    }

    #[test]
    fn public_body_hides_smtp_details() {
        let body = MailError::Connection("connection refused".into()).to_public();
        assert_eq!(body.reason, "Mail service is unavailable.");
        assert!(!body.ways_to_solve.is_empty());
    }
}
