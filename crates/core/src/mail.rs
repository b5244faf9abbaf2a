//! Outbound email.
//!
//! The credential workflow only needs to hand a message to something that delivers it.
//! [`LogMailer`] is the shipped implementation and records the message through `tracing`.

use crate::config::MailConfig;
use crate::{EmailAddress, HospitalResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipients: Vec<EmailAddress>,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

impl EmailMessage {
    /// The password-reset message carrying a one-time code.
    pub fn forgot_password(recipient: EmailAddress, code: &str) -> Self {
        Self {
            recipients: vec![recipient],
            subject: "Forgot Password".into(),
            body: format!("<h2>Hello, your otp to reset password is {code}!</h2>"),
        }
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> HospitalResult<()>;
}

/// Mailer that logs each message instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer {
    config: MailConfig,
}

impl LogMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> HospitalResult<()> {
        let to = message
            .recipients
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let from = self.config.from_address.as_deref().unwrap_or("(unset)");

        tracing::info!(%to, from, subject = %message.subject, "email queued");
        tracing::debug!(body = %message.body, "email body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forgot_password_message_carries_code() {
        let to = EmailAddress::parse("ada@example.org").expect("valid email");
        let message = EmailMessage::forgot_password(to.clone(), "123456");

        assert_eq!(message.recipients, vec![to]);
        assert_eq!(message.subject, "Forgot Password");
        assert!(message.body.contains("123456"));
    }

    #[test]
    fn test_log_mailer_accepts_messages() {
        let mailer = LogMailer::default();
        let message = EmailMessage::forgot_password(
            EmailAddress::parse("ada@example.org").unwrap(),
            "654321",
        );
        mailer.send(&message).expect("log mailer never fails");
    }
}
