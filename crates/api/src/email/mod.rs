//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama templates for the messages
//! the API composes itself. Caller-supplied HTML is sanitized with ammonia
//! before it is sent or stored.

mod sanitize;

#[cfg(any(test, feature = "test-support"))]
mod fake;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEmailSender;
pub use sanitize::{html_to_text, sanitize_html};

/// HTML template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
}

/// Plain text template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The provider refused the message.
    #[error("Rejected by provider: {0}")]
    Rejected(String),
}

/// A message ready to hand to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    /// Already-sanitized HTML alternative.
    pub html_body: Option<String>,
}

impl OutgoingEmail {
    /// Render the welcome message sent after registration.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn welcome(to: &str, name: &str) -> Result<Self, EmailError> {
        Ok(Self {
            to: to.to_owned(),
            subject: "Welcome to Storeline".to_owned(),
            text_body: WelcomeEmailText { name }.render()?,
            html_body: Some(WelcomeEmailHtml { name }.render()?),
        })
    }
}

/// Delivery seam for the email provider.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP delivery through the configured relay.
#[derive(Clone)]
pub struct SmtpEmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpEmailSender {
    /// Create a new SMTP sender from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, EmailError> {
        let builder = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(&email.subject);

        let message = match &email.html_body {
            Some(html) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.clone()),
                    ),
            )?,
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.text_body.clone())?,
        };
        Ok(message)
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = self.build_message(email)?;
        let response = self.mailer.send(message).await?;
        if !response.is_positive() {
            return Err(EmailError::Rejected(response.code().to_string()));
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_renders_both_parts() {
        let email = OutgoingEmail::welcome("jane@example.com", "Jane").unwrap();
        assert_eq!(email.to, "jane@example.com");
        assert!(email.text_body.contains("Jane"));
        assert!(email.html_body.unwrap().contains("Jane"));
    }

    #[test]
    fn test_welcome_escapes_name() {
        let email = OutgoingEmail::welcome("a@b.co", "<script>x</script>").unwrap();
        assert!(!email.html_body.unwrap().contains("<script>"));
    }
}
