//! Notification channel seam.
//!
//! Delivery backends (SMTP today, push later) implement this trait. The
//! dispatch side treats the channel as best-effort: a failed send is logged
//! and the reminder is still marked sent, never retried.

use async_trait::async_trait;

use crate::error::Result;

/// An outbound delivery mechanism for rendered reminder messages.
///
/// Implementations must tolerate being invoked more than once for the same
/// logical reminder: two concurrently running dispatch passes can both pick
/// up a due reminder before either marks it sent. That duplicate is an
/// accepted race, not something the channel should dedupe.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name for logging ("email", "console", ...).
    fn name(&self) -> &str;

    /// Send one message. `tags` are free-form labels ("task-reminder",
    /// "daily-digest") that channels may attach as metadata.
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        body_text: &str,
        tags: &[&str],
    ) -> Result<()>;
}
