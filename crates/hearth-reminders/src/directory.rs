//! Read-only views of task and user data.
//!
//! Tasks and users belong to other parts of the product; this subsystem only
//! needs narrow find operations to decide whether and what to send, and it
//! never mutates either collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hearth_core::error::Result;

/// A household task as the reminder engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub due_at: DateTime<Utc>,
    pub priority: Priority,
    pub category: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A user profile as the reminder engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    /// Stored for display only; reminder arithmetic runs on the engine's
    /// own clock (timezone-aware scheduling is out of scope).
    pub timezone: String,
    pub opt_outs: OptOuts,
}

/// Per-channel opt-out flags. `true` means the user declined that cadence.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OptOuts {
    #[serde(default)]
    pub task_reminders: bool,
    #[serde(default)]
    pub overdue_reminders: bool,
    #[serde(default)]
    pub daily_digest: bool,
}

/// Read-only task lookups.
pub trait TaskDirectory: Send + Sync {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>>;

    /// Incomplete tasks whose due date is strictly before `as_of`.
    fn find_overdue(&self, user_id: &str, as_of: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Incomplete tasks with due date in `[start, end)`.
    fn find_due_within(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>>;
}

/// Read-only user lookups.
pub trait UserDirectory: Send + Sync {
    fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>>;
}
