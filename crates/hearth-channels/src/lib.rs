//! # Hearth Channels
//!
//! Delivery backends implementing [`hearth_core::NotificationChannel`].
//! Email (async SMTP via lettre) is the only production channel today.

pub mod email;

pub use email::EmailChannel;
