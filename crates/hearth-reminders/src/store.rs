//! SQLite-backed reminder store.
//!
//! The only mutable state this subsystem owns. Scheduling replaces pending
//! rows atomically (delete + insert in one transaction) so a task whose due
//! date is edited repeatedly never accumulates stale pending reminders.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use hearth_core::error::{HearthError, Result};

use crate::reminder::{Reminder, ReminderKind};

/// Reminder persistence store.
pub struct ReminderDb {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamp so lexicographic comparison in SQL matches
/// chronological order.
fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

impl ReminderDb {
    /// Open or create the reminder database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .map_err(|e| HearthError::Store(format!("DB open: {e}")))?;
        // WAL for concurrent readers (scheduler calls race the dispatch loop)
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| HearthError::Store(format!("DB open: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reminders (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL DEFAULT '',
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                remind_at TEXT NOT NULL,
                sent INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                sent_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_reminders_due
                ON reminders (sent, remind_at);
            ",
        )
        .map_err(|e| HearthError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HearthError::Store(format!("Lock: {e}")))
    }

    /// Insert a reminder, superseding any unsent reminders for the same
    /// (key, kind) pair. Runs as one transaction so there is no window where
    /// zero or two pending rows exist for the key.
    pub fn replace_pending(&self, reminder: &Reminder) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| HearthError::Store(format!("Begin: {e}")))?;

        let key_column = match reminder.kind {
            ReminderKind::TaskReminder => "task_id",
            ReminderKind::OverdueCheck | ReminderKind::DailyDigest => "user_id",
        };
        tx.execute(
            &format!("DELETE FROM reminders WHERE {key_column} = ?1 AND kind = ?2 AND sent = 0"),
            params![reminder.supersession_key(), reminder.kind.as_str()],
        )
        .map_err(|e| HearthError::Store(format!("Supersede: {e}")))?;

        tx.execute(
            "INSERT INTO reminders (id, task_id, user_id, kind, remind_at, sent, created_at, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                reminder.id,
                reminder.task_id,
                reminder.user_id,
                reminder.kind.as_str(),
                ts(reminder.remind_at),
                reminder.sent as i32,
                ts(reminder.created_at),
                reminder.sent_at.map(ts),
            ],
        )
        .map_err(|e| HearthError::Store(format!("Insert: {e}")))?;

        tx.commit()
            .map_err(|e| HearthError::Store(format!("Commit: {e}")))?;
        Ok(())
    }

    /// All unsent reminders due at or before `now`. No ordering guarantee.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, task_id, user_id, kind, remind_at, sent, created_at, sent_at
                 FROM reminders WHERE sent = 0 AND remind_at <= ?1",
            )
            .map_err(|e| HearthError::Store(format!("Prepare: {e}")))?;

        let rows = stmt
            .query_map(params![ts(now)], row_to_reminder)
            .map_err(|e| HearthError::Store(format!("Query due: {e}")))?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Flip a reminder to sent with the given timestamp. Exactly-once from
    /// the store's perspective; a second call is a harmless overwrite.
    pub fn mark_sent(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE reminders SET sent = 1, sent_at = ?1 WHERE id = ?2",
            params![ts(at), id],
        )
        .map_err(|e| HearthError::Store(format!("Mark sent: {e}")))?;
        Ok(())
    }

    /// Unsent reminders for a supersession key + kind. Used by tests and the
    /// admin inspection surface; the invariant says at most one row comes
    /// back.
    pub fn pending_for(&self, key: &str, kind: ReminderKind) -> Result<Vec<Reminder>> {
        let key_column = match kind {
            ReminderKind::TaskReminder => "task_id",
            ReminderKind::OverdueCheck | ReminderKind::DailyDigest => "user_id",
        };
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, task_id, user_id, kind, remind_at, sent, created_at, sent_at
                 FROM reminders WHERE {key_column} = ?1 AND kind = ?2 AND sent = 0"
            ))
            .map_err(|e| HearthError::Store(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map(params![key, kind.as_str()], row_to_reminder)
            .map_err(|e| HearthError::Store(format!("Query pending: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Fetch one reminder by ID.
    pub fn get(&self, id: &str) -> Result<Option<Reminder>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, task_id, user_id, kind, remind_at, sent, created_at, sent_at
                 FROM reminders WHERE id = ?1",
            )
            .map_err(|e| HearthError::Store(format!("Prepare: {e}")))?;
        let mut rows = stmt
            .query_map(params![id], row_to_reminder)
            .map_err(|e| HearthError::Store(format!("Query get: {e}")))?;
        Ok(rows.next().transpose().ok().flatten())
    }
}

fn row_to_reminder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    let kind_str: String = row.get(3)?;
    let remind_at_str: String = row.get(4)?;
    let created_at_str: String = row.get(6)?;
    let sent_at_str: Option<String> = row.get(7)?;

    Ok(Reminder {
        id: row.get(0)?,
        task_id: row.get(1)?,
        user_id: row.get(2)?,
        kind: ReminderKind::parse(&kind_str).unwrap_or(ReminderKind::TaskReminder),
        remind_at: parse_ts(&remind_at_str).unwrap_or_else(Utc::now),
        sent: row.get::<_, i32>(5)? != 0,
        created_at: parse_ts(&created_at_str).unwrap_or_else(Utc::now),
        sent_at: sent_at_str.as_deref().and_then(parse_ts),
    })
}
