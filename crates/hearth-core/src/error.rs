//! Hearth error type.

use thiserror::Error;

/// Errors surfaced by the reminder subsystem.
///
/// Almost nothing here is fatal: scheduling and dispatch are decoupled from
/// the request that triggered them, so callers typically log these and move
/// on rather than propagating them to an end user.
#[derive(Debug, Error)]
pub enum HearthError {
    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Reminder store (SQLite) failure.
    #[error("store error: {0}")]
    Store(String),

    /// Notification channel (SMTP, etc.) failure.
    #[error("channel error: {0}")]
    Channel(String),

    /// Task/User directory lookup failure.
    #[error("directory error: {0}")]
    Directory(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout Hearth.
pub type Result<T> = std::result::Result<T, HearthError>;
