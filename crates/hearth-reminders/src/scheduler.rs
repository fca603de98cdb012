//! Reminder scheduler — the only component that decides reminder timestamps.
//!
//! Every `schedule_*` call supersedes: unsent rows for the same (key, kind)
//! are replaced in one store transaction, so editing a task's due date five
//! times leaves exactly one pending reminder, not five.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};

use crate::clock::Clock;
use crate::reminder::{Reminder, ReminderKind};
use crate::store::ReminderDb;

/// Fixed wall-clock hours (UTC) the recurring kinds fire at.
#[derive(Debug, Clone, Copy)]
pub struct SchedulePolicy {
    pub digest_hour: u32,
    pub overdue_hour: u32,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            digest_hour: 8,
            overdue_hour: 18,
        }
    }
}

/// Creates and supersedes reminder records.
///
/// Store failures are logged and swallowed: reminders are advisory, and the
/// application action that triggered the schedule must not roll back because
/// a notification could not be queued.
pub struct ReminderScheduler {
    db: Arc<ReminderDb>,
    clock: Arc<dyn Clock>,
    policy: SchedulePolicy,
}

impl ReminderScheduler {
    pub fn new(db: Arc<ReminderDb>, clock: Arc<dyn Clock>, policy: SchedulePolicy) -> Self {
        Self { db, clock, policy }
    }

    /// Attach a reminder to a task at a caller-chosen instant. Past instants
    /// are fine; the next dispatch pass picks them up.
    pub fn schedule_task_reminder(&self, task_id: &str, user_id: &str, at: DateTime<Utc>) {
        let reminder = Reminder::task(task_id, user_id, at, self.clock.now());
        self.insert(reminder);
    }

    /// Arm (or re-arm) the user's daily digest for tomorrow at the digest
    /// hour. Idempotent until it fires.
    pub fn schedule_daily_digest(&self, user_id: &str) {
        let at = self.next_day_at(self.policy.digest_hour);
        let reminder = Reminder::daily_digest(user_id, at, self.clock.now());
        self.insert(reminder);
    }

    /// Arm (or re-arm) the user's overdue check for tomorrow at the overdue
    /// hour. Idempotent until it fires.
    pub fn schedule_overdue_check(&self, user_id: &str) {
        let at = self.next_day_at(self.policy.overdue_hour);
        let reminder = Reminder::overdue_check(user_id, at, self.clock.now());
        self.insert(reminder);
    }

    /// Re-arm a recurring kind after it fired. Task reminders are single
    /// fire and never come through here.
    pub fn schedule_next(&self, kind: ReminderKind, user_id: &str) {
        match kind {
            ReminderKind::DailyDigest => self.schedule_daily_digest(user_id),
            ReminderKind::OverdueCheck => self.schedule_overdue_check(user_id),
            ReminderKind::TaskReminder => {
                tracing::debug!("task reminders do not recur; ignoring schedule_next");
            }
        }
    }

    fn insert(&self, reminder: Reminder) {
        match self.db.replace_pending(&reminder) {
            Ok(()) => tracing::info!(
                kind = %reminder.kind,
                key = reminder.supersession_key(),
                remind_at = %reminder.remind_at,
                "reminder scheduled"
            ),
            // Best-effort: the caller's action must not fail over this
            Err(e) => tracing::warn!(
                kind = %reminder.kind,
                key = reminder.supersession_key(),
                "failed to schedule reminder: {e}"
            ),
        }
    }

    /// Next calendar day at the given hour, engine wall clock. Anchoring to
    /// the calendar day (not now + 24h) keeps recurring reminders from
    /// drifting later each cycle.
    fn next_day_at(&self, hour: u32) -> DateTime<Utc> {
        let day = self.clock.now().date_naive() + Days::new(1);
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        day.and_time(time).and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn setup(now: DateTime<Utc>) -> (Arc<ReminderDb>, Arc<ManualClock>, ReminderScheduler) {
        let db = Arc::new(ReminderDb::open_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(now));
        let scheduler =
            ReminderScheduler::new(db.clone(), clock.clone(), SchedulePolicy::default());
        (db, clock, scheduler)
    }

    #[test]
    fn test_task_reminder_supersession() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
        let (db, _clock, scheduler) = setup(now);

        let ten = Utc.with_ymd_and_hms(2026, 8, 28, 10, 0, 0).unwrap();
        let eleven = Utc.with_ymd_and_hms(2026, 8, 28, 11, 0, 0).unwrap();
        scheduler.schedule_task_reminder("abc", "u1", ten);
        scheduler.schedule_task_reminder("abc", "u1", eleven);

        let pending = db.pending_for("abc", ReminderKind::TaskReminder).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].remind_at, eleven);
    }

    #[test]
    fn test_digest_lands_next_day_at_eight() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 21, 45, 12).unwrap();
        let (db, _clock, scheduler) = setup(now);

        scheduler.schedule_daily_digest("u1");
        let pending = db.pending_for("u1", ReminderKind::DailyDigest).unwrap();
        assert_eq!(
            pending[0].remind_at,
            Utc.with_ymd_and_hms(2026, 8, 29, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_overdue_check_lands_next_day_at_eighteen() {
        // Even scheduled at 01:00, the check lands tomorrow, never today
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 1, 0, 0).unwrap();
        let (db, _clock, scheduler) = setup(now);

        scheduler.schedule_overdue_check("u1");
        let pending = db.pending_for("u1", ReminderKind::OverdueCheck).unwrap();
        assert_eq!(
            pending[0].remind_at,
            Utc.with_ymd_and_hms(2026, 8, 29, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_recurring_schedule_is_idempotent_before_firing() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
        let (db, _clock, scheduler) = setup(now);

        scheduler.schedule_daily_digest("u1");
        scheduler.schedule_daily_digest("u1");
        scheduler.schedule_overdue_check("u1");
        scheduler.schedule_overdue_check("u1");

        assert_eq!(db.pending_for("u1", ReminderKind::DailyDigest).unwrap().len(), 1);
        assert_eq!(db.pending_for("u1", ReminderKind::OverdueCheck).unwrap().len(), 1);
    }

    #[test]
    fn test_no_drift_across_month_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 8, 31, 8, 0, 5).unwrap();
        let (db, _clock, scheduler) = setup(now);

        scheduler.schedule_daily_digest("u1");
        let pending = db.pending_for("u1", ReminderKind::DailyDigest).unwrap();
        assert_eq!(
            pending[0].remind_at,
            Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_schedule_next_ignores_task_reminders() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
        let (db, _clock, scheduler) = setup(now);

        scheduler.schedule_next(ReminderKind::TaskReminder, "u1");
        assert!(db.pending_for("u1", ReminderKind::TaskReminder).unwrap().is_empty());
    }
}
