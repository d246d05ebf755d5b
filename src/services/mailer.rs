// src/services/mailer.rs
//! Email delivery collaborator.
//!
//! The OTP service only depends on `Mailer::send`; whether mail actually
//! leaves the box is a deployment concern. With `SES_FROM_EMAIL` set the
//! mailer goes through SESv2; without it, delivery is a log line so local
//! development works with no AWS account.

use aws_config::BehaviorVersion;
use aws_sdk_sesv2::Client as SesClient;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::common::safe_email_log;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("email send failed: {0}")]
    SendFailed(String),
    #[error("email send timed out")]
    Timeout,
}

pub enum Mailer {
    Ses {
        client: SesClient,
        from_email: String,
    },
    /// No delivery backend configured. Sends succeed and the message is
    /// logged instead, with the recipient masked.
    Disabled,
}

impl Mailer {
    /// Build the mailer from the environment. SES is used when
    /// `SES_FROM_EMAIL` is present; region and credentials come from the
    /// standard AWS provider chain.
    pub async fn from_env() -> Self {
        match std::env::var("SES_FROM_EMAIL") {
            Ok(from_email) if !from_email.trim().is_empty() => {
                let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
                let client = SesClient::new(&aws_config);
                info!(from = %from_email, "Mailer initialized with SES backend");
                Mailer::Ses { client, from_email }
            }
            _ => {
                warn!("SES_FROM_EMAIL not set, outgoing email will be logged instead of sent");
                Mailer::Disabled
            }
        }
    }

    /// Send an HTML email to a single recipient.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        match self {
            Mailer::Ses { client, from_email } => {
                let send = send_via_ses(client, from_email, to, subject, body);
                match tokio::time::timeout(SEND_TIMEOUT, send).await {
                    Ok(result) => result,
                    Err(_) => {
                        error!(to = %safe_email_log(to), "Email send timed out");
                        Err(MailerError::Timeout)
                    }
                }
            }
            Mailer::Disabled => {
                info!(to = %safe_email_log(to), subject = %subject, "Email delivery disabled, logging instead");
                debug!(body = %body, "Suppressed email body");
                Ok(())
            }
        }
    }
}

async fn send_via_ses(
    client: &SesClient,
    from_email: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<(), MailerError> {
    use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};

    let destination = Destination::builder().to_addresses(to).build();

    let subject_content = Content::builder()
        .data(subject)
        .charset("UTF-8")
        .build()
        .map_err(|e| MailerError::SendFailed(format!("failed to build subject: {}", e)))?;

    let body_content = Content::builder()
        .data(body)
        .charset("UTF-8")
        .build()
        .map_err(|e| MailerError::SendFailed(format!("failed to build body: {}", e)))?;

    let ses_body = SesBody::builder().html(body_content).build();

    let message = Message::builder()
        .subject(subject_content)
        .body(ses_body)
        .build();

    let email_content = EmailContent::builder().simple(message).build();

    let result = client
        .send_email()
        .from_email_address(from_email)
        .destination(destination)
        .content(email_content)
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, to = %safe_email_log(to), "Failed to send email via SES");
            MailerError::SendFailed(format!("send failed: {}", e))
        })?;

    info!(
        to = %safe_email_log(to),
        message_id = ?result.message_id(),
        "Email sent successfully via SES"
    );

    Ok(())
}
