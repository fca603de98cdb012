//! Email channel — async SMTP sending via lettre.
//!
//! Builds a multipart (text + HTML) message per notification and submits it
//! through a STARTTLS relay. Stateless: a fresh transport per send keeps the
//! channel free of connection babysitting at our low volumes.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use hearth_core::channel::NotificationChannel;
use hearth_core::config::EmailConfig;
use hearth_core::error::{HearthError, Result};

/// SMTP-backed notification channel.
pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn from_mailbox(&self) -> Result<Mailbox> {
        format!("{} <{}>", self.config.from_name, self.config.from_address)
            .parse()
            .map_err(|e| HearthError::Channel(format!("Invalid from address: {e}")))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| HearthError::Channel(format!("SMTP relay: {e}")))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build(),
        )
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        body_text: &str,
        tags: &[&str],
    ) -> Result<()> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| HearthError::Channel(format!("Invalid recipient: {e}")))?;

        let email = Message::builder()
            .from(self.from_mailbox()?)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body_text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(body_html.to_string()),
                    ),
            )
            .map_err(|e| HearthError::Channel(format!("Build email: {e}")))?;

        self.transport()?
            .send(email)
            .await
            .map_err(|e| HearthError::Channel(format!("SMTP send: {e}")))?;

        tracing::info!(recipient, subject, tags = ?tags, "email sent");
        Ok(())
    }
}
