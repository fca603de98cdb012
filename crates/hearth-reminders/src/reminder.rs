//! Reminder definitions — the core data model for scheduled notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled, single-fire notification intent.
///
/// A reminder is created by the scheduler, flips from unsent to sent exactly
/// once when the dispatch loop fires it, and is only ever deleted by
/// supersession (a newer reminder for the same key replacing it before it
/// fires).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// Unique reminder ID.
    pub id: String,
    /// Referenced task. Empty for user-scoped kinds (digest, overdue check).
    pub task_id: String,
    /// Recipient user.
    pub user_id: String,
    /// When this reminder becomes due. May be in the past; the next dispatch
    /// pass picks it up.
    pub remind_at: DateTime<Utc>,
    /// What firing this reminder means.
    pub kind: ReminderKind,
    /// Whether the dispatch loop has already fired this reminder.
    pub sent: bool,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// When the reminder was fired.
    pub sent_at: Option<DateTime<Utc>>,
}

/// Reminder kinds — one delivery behavior per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderKind {
    /// Single-task nudge at a caller-chosen time. Fires once.
    TaskReminder,
    /// Daily sweep for tasks past their due date. Re-arms itself.
    OverdueCheck,
    /// Daily summary of tasks due today/tomorrow. Re-arms itself.
    DailyDigest,
}

impl ReminderKind {
    /// Stable string form used in the store and in channel tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::TaskReminder => "task-reminder",
            ReminderKind::OverdueCheck => "overdue-check",
            ReminderKind::DailyDigest => "daily-digest",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "task-reminder" => Some(ReminderKind::TaskReminder),
            "overdue-check" => Some(ReminderKind::OverdueCheck),
            "daily-digest" => Some(ReminderKind::DailyDigest),
            _ => None,
        }
    }

    /// Whether firing this kind schedules its own next occurrence.
    pub fn recurs(&self) -> bool {
        matches!(self, ReminderKind::OverdueCheck | ReminderKind::DailyDigest)
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Reminder {
    /// Create a task reminder at a caller-chosen instant.
    pub fn task(task_id: &str, user_id: &str, at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::new(ReminderKind::TaskReminder, task_id, user_id, at, now)
    }

    /// Create an overdue-check reminder.
    pub fn overdue_check(user_id: &str, at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::new(ReminderKind::OverdueCheck, "", user_id, at, now)
    }

    /// Create a daily-digest reminder.
    pub fn daily_digest(user_id: &str, at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::new(ReminderKind::DailyDigest, "", user_id, at, now)
    }

    fn new(
        kind: ReminderKind,
        task_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            remind_at: at,
            kind,
            sent: false,
            created_at: now,
            sent_at: None,
        }
    }

    /// The key supersession operates on: at most one unsent reminder exists
    /// per (key, kind) at any time. Task reminders key on the task, the
    /// user-scoped kinds key on the user.
    pub fn supersession_key(&self) -> &str {
        match self.kind {
            ReminderKind::TaskReminder => &self.task_id,
            ReminderKind::OverdueCheck | ReminderKind::DailyDigest => &self.user_id,
        }
    }
}
