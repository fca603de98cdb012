//! # Hearth Core
//!
//! Shared foundation for the Hearth reminder subsystem: the error type,
//! the TOML configuration layer, and the notification channel seam that
//! delivery backends implement.

pub mod channel;
pub mod config;
pub mod error;

pub use channel::NotificationChannel;
pub use config::{EmailConfig, HearthConfig, ReminderConfig};
pub use error::{HearthError, Result};
