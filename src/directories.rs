//! Read-only SQLite adapters over the host app's task and user tables.
//!
//! The reminder engine owns only its own reminders database; tasks and users
//! live in the main Hearth app database. These adapters open that file
//! read-only and expose the narrow find operations the dispatcher needs.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};

use hearth_core::error::{HearthError, Result};
use hearth_reminders::{OptOuts, Priority, Task, TaskDirectory, User, UserDirectory};

fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| HearthError::Directory(format!("App DB open: {e}")))
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const TASK_COLUMNS: &str =
    "id, user_id, title, description, due_at, priority, category, completed";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let due_at_str: String = row.get(4)?;
    let priority_str: String = row.get(5)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        due_at: parse_ts(&due_at_str),
        priority: Priority::parse(&priority_str).unwrap_or(Priority::Medium),
        category: row.get(6)?,
        completed: row.get::<_, i32>(7)? != 0,
    })
}

/// Task lookups against the host app database.
pub struct SqliteTaskDirectory {
    conn: Mutex<Connection>,
}

impl SqliteTaskDirectory {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_read_only(path)?),
        })
    }

    fn incomplete_for(&self, user_id: &str) -> Result<Vec<Task>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HearthError::Directory(format!("Lock: {e}")))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND completed = 0"
            ))
            .map_err(|e| HearthError::Directory(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map(params![user_id], row_to_task)
            .map_err(|e| HearthError::Directory(format!("Query tasks: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

impl TaskDirectory for SqliteTaskDirectory {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HearthError::Directory(format!("Lock: {e}")))?;
        let mut stmt = conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .map_err(|e| HearthError::Directory(format!("Prepare: {e}")))?;
        let mut rows = stmt
            .query_map(params![task_id], row_to_task)
            .map_err(|e| HearthError::Directory(format!("Query task: {e}")))?;
        Ok(rows.next().transpose().ok().flatten())
    }

    fn find_overdue(&self, user_id: &str, as_of: DateTime<Utc>) -> Result<Vec<Task>> {
        // Timestamps are filtered in Rust: the host app's column format is
        // not guaranteed to compare lexicographically
        Ok(self
            .incomplete_for(user_id)?
            .into_iter()
            .filter(|t| t.due_at < as_of)
            .collect())
    }

    fn find_due_within(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        Ok(self
            .incomplete_for(user_id)?
            .into_iter()
            .filter(|t| t.due_at >= start && t.due_at < end)
            .collect())
    }
}

/// User lookups against the host app database.
pub struct SqliteUserDirectory {
    conn: Mutex<Connection>,
}

impl SqliteUserDirectory {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_read_only(path)?),
        })
    }
}

impl UserDirectory for SqliteUserDirectory {
    fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HearthError::Directory(format!("Lock: {e}")))?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, email, name, timezone,
                        opt_out_task_reminders, opt_out_overdue_reminders, opt_out_daily_digest
                 FROM users WHERE user_id = ?1",
            )
            .map_err(|e| HearthError::Directory(format!("Prepare: {e}")))?;
        let mut rows = stmt
            .query_map(params![user_id], |row| {
                Ok(User {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    timezone: row.get(3)?,
                    opt_outs: OptOuts {
                        task_reminders: row.get::<_, i32>(4)? != 0,
                        overdue_reminders: row.get::<_, i32>(5)? != 0,
                        daily_digest: row.get::<_, i32>(6)? != 0,
                    },
                })
            })
            .map_err(|e| HearthError::Directory(format!("Query user: {e}")))?;
        Ok(rows.next().transpose().ok().flatten())
    }
}
