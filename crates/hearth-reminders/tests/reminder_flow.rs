//! End-to-end reminder flow: scheduler → store → engine → channel,
//! driven by a manual clock across simulated days.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use hearth_core::channel::NotificationChannel;
use hearth_core::error::Result;
use hearth_reminders::{
    Dispatcher, ManualClock, OptOuts, Priority, Reminder, ReminderDb, ReminderEngine,
    ReminderKind, ReminderScheduler, SchedulePolicy, Task, TaskDirectory, User, UserDirectory,
};

struct InMemoryTasks {
    tasks: Mutex<Vec<Task>>,
}

impl TaskDirectory for InMemoryTasks {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == task_id)
            .cloned())
    }

    fn find_overdue(&self, user_id: &str, as_of: DateTime<Utc>) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id && !t.completed && t.due_at < as_of)
            .cloned()
            .collect())
    }

    fn find_due_within(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id && !t.completed && t.due_at >= start && t.due_at < end)
            .cloned()
            .collect())
    }
}

struct InMemoryUsers {
    users: Vec<User>,
}

impl UserDirectory for InMemoryUsers {
    fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.user_id == user_id).cloned())
    }
}

#[derive(Clone)]
struct SentMail {
    recipient: String,
    subject: String,
    body_text: String,
    tags: Vec<String>,
}

#[derive(Default)]
struct Outbox {
    mail: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl NotificationChannel for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        _body_html: &str,
        body_text: &str,
        tags: &[&str],
    ) -> Result<()> {
        self.mail.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body_text: body_text.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        });
        Ok(())
    }
}

struct World {
    engine: Arc<ReminderEngine>,
    scheduler: ReminderScheduler,
    db: Arc<ReminderDb>,
    clock: Arc<ManualClock>,
    outbox: Arc<Outbox>,
}

fn world(start: DateTime<Utc>, tasks: Vec<Task>, users: Vec<User>) -> World {
    let db = Arc::new(ReminderDb::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new(start));
    let outbox = Arc::new(Outbox::default());
    let scheduler = ReminderScheduler::new(db.clone(), clock.clone(), SchedulePolicy::default());
    let dispatcher = Dispatcher::new(
        Arc::new(InMemoryTasks {
            tasks: Mutex::new(tasks),
        }),
        Arc::new(InMemoryUsers { users }),
        outbox.clone(),
        clock.clone(),
    );
    let engine = Arc::new(ReminderEngine::new(
        db.clone(),
        ReminderScheduler::new(db.clone(), clock.clone(), SchedulePolicy::default()),
        dispatcher,
        clock.clone(),
        Duration::from_secs(30),
    ));
    World {
        engine,
        scheduler,
        db,
        clock,
        outbox,
    }
}

fn household_user(id: &str, name: &str) -> User {
    User {
        user_id: id.to_string(),
        email: format!("{id}@example.com"),
        name: name.to_string(),
        timezone: "Europe/London".to_string(),
        opt_outs: OptOuts::default(),
    }
}

fn chore(id: &str, user_id: &str, title: &str, due_at: DateTime<Utc>) -> Task {
    Task {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        due_at,
        priority: Priority::Medium,
        category: "household".to_string(),
        completed: false,
    }
}

#[tokio::test]
async fn nursery_fees_reminder_fires_within_two_polls() {
    let start = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
    let due = start + chrono::Duration::days(1);
    let w = world(
        start,
        vec![chore("fees", "priya", "Pay nursery fees", due)],
        vec![household_user("priya", "Priya")],
    );

    // Reminder a minute out, poll cadence 30s: two passes must catch it
    w.scheduler
        .schedule_task_reminder("fees", "priya", start + chrono::Duration::minutes(1));

    w.engine.process_pending_reminders().await.unwrap();
    assert!(w.outbox.mail.lock().unwrap().is_empty());

    w.clock.advance(chrono::Duration::seconds(30));
    w.engine.process_pending_reminders().await.unwrap();
    w.clock.advance(chrono::Duration::seconds(30));
    w.engine.process_pending_reminders().await.unwrap();

    let mail = w.outbox.mail.lock().unwrap();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].recipient, "priya@example.com");
    assert!(mail[0].subject.contains("Pay nursery fees"));
    assert_eq!(mail[0].tags, vec!["task-reminder"]);

    let pending = w
        .db
        .pending_for("fees", ReminderKind::TaskReminder)
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn rescheduled_reminder_fires_at_the_new_time_only() {
    let start = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
    let ten = Utc.with_ymd_and_hms(2026, 8, 28, 10, 0, 0).unwrap();
    let eleven = Utc.with_ymd_and_hms(2026, 8, 28, 11, 0, 0).unwrap();
    let w = world(
        start,
        vec![chore("abc", "priya", "Pick up dry cleaning", eleven)],
        vec![household_user("priya", "Priya")],
    );

    w.scheduler.schedule_task_reminder("abc", "priya", ten);
    w.scheduler.schedule_task_reminder("abc", "priya", eleven);

    let pending = w.db.pending_for("abc", ReminderKind::TaskReminder).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].remind_at, eleven);

    // At 10:30 the superseded reminder must not fire
    w.clock.set(Utc.with_ymd_and_hms(2026, 8, 28, 10, 30, 0).unwrap());
    w.engine.process_pending_reminders().await.unwrap();
    assert!(w.outbox.mail.lock().unwrap().is_empty());

    w.clock.set(eleven + chrono::Duration::seconds(5));
    w.engine.process_pending_reminders().await.unwrap();
    assert_eq!(w.outbox.mail.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn digest_and_overdue_split_a_users_day() {
    // Two tasks due today, one overdue from yesterday. The 08:00 digest
    // lists exactly the two due today; the overdue one waits for 18:00.
    let digest_time = Utc.with_ymd_and_hms(2026, 8, 28, 8, 0, 0).unwrap();
    let yesterday = Utc.with_ymd_and_hms(2026, 8, 27, 17, 0, 0).unwrap();
    let midday = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2026, 8, 28, 16, 0, 0).unwrap();

    let w = world(
        digest_time,
        vec![
            chore("t-laundry", "sam", "Do the laundry", midday),
            chore("t-dinner", "sam", "Prep dinner", evening),
            chore("t-bins", "sam", "Take out bins", yesterday),
        ],
        vec![household_user("sam", "Sam")],
    );

    w.db
        .replace_pending(&Reminder::daily_digest("sam", digest_time, digest_time))
        .unwrap();
    w.db
        .replace_pending(&Reminder::overdue_check(
            "sam",
            Utc.with_ymd_and_hms(2026, 8, 28, 18, 0, 0).unwrap(),
            digest_time,
        ))
        .unwrap();

    // 08:00 pass: digest only
    w.engine.process_pending_reminders().await.unwrap();
    {
        let mail = w.outbox.mail.lock().unwrap();
        assert_eq!(mail.len(), 1);
        assert_eq!(mail[0].tags, vec!["daily-digest"]);
        assert!(mail[0].body_text.contains("Do the laundry"));
        assert!(mail[0].body_text.contains("Prep dinner"));
        assert!(!mail[0].body_text.contains("Take out bins"));
    }

    // 18:00 pass: overdue check catches yesterday's chore
    w.clock.set(Utc.with_ymd_and_hms(2026, 8, 28, 18, 0, 30).unwrap());
    w.engine.process_pending_reminders().await.unwrap();
    {
        let mail = w.outbox.mail.lock().unwrap();
        assert_eq!(mail.len(), 2);
        assert_eq!(mail[1].tags, vec!["overdue-check"]);
        assert!(mail[1].body_text.contains("Take out bins"));
        assert!(!mail[1].body_text.contains("Do the laundry"));
    }

    // Both cadences re-armed themselves for tomorrow
    let digest = w.db.pending_for("sam", ReminderKind::DailyDigest).unwrap();
    assert_eq!(
        digest[0].remind_at,
        Utc.with_ymd_and_hms(2026, 8, 29, 8, 0, 0).unwrap()
    );
    let overdue = w.db.pending_for("sam", ReminderKind::OverdueCheck).unwrap();
    assert_eq!(
        overdue[0].remind_at,
        Utc.with_ymd_and_hms(2026, 8, 29, 18, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn recurring_cadence_survives_quiet_days() {
    // A user with no tasks at all still keeps their digest cadence alive
    let start = Utc.with_ymd_and_hms(2026, 8, 28, 7, 0, 0).unwrap();
    let w = world(start, vec![], vec![household_user("sam", "Sam")]);

    w.scheduler.schedule_daily_digest("sam");

    // Walk three quiet days; the cadence must never break or drift
    for day in 29..=31 {
        w.clock
            .set(Utc.with_ymd_and_hms(2026, 8, day, 8, 0, 10).unwrap());
        w.engine.process_pending_reminders().await.unwrap();

        let pending = w.db.pending_for("sam", ReminderKind::DailyDigest).unwrap();
        assert_eq!(pending.len(), 1);
        let expect_day = if day == 31 { (9, 1) } else { (8, day + 1) };
        assert_eq!(
            pending[0].remind_at,
            Utc.with_ymd_and_hms(2026, expect_day.0, expect_day.1, 8, 0, 0).unwrap()
        );
    }
    assert!(w.outbox.mail.lock().unwrap().is_empty());
}

#[tokio::test]
async fn polling_loop_delivers_and_stops_cleanly() {
    let start = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
    let due = start + chrono::Duration::hours(3);
    let mut w = world(
        start,
        vec![chore("t1", "priya", "Water the garden", due)],
        vec![household_user("priya", "Priya")],
    );
    // Fast cadence for the test; production default is 30s
    w.engine = Arc::new(ReminderEngine::new(
        w.db.clone(),
        ReminderScheduler::new(w.db.clone(), w.clock.clone(), SchedulePolicy::default()),
        Dispatcher::new(
            Arc::new(InMemoryTasks {
                tasks: Mutex::new(vec![chore("t1", "priya", "Water the garden", due)]),
            }),
            Arc::new(InMemoryUsers {
                users: vec![household_user("priya", "Priya")],
            }),
            w.outbox.clone(),
            w.clock.clone(),
        ),
        w.clock.clone(),
        Duration::from_millis(10),
    ));

    w.scheduler
        .schedule_task_reminder("t1", "priya", start - chrono::Duration::minutes(5));

    w.engine.start();
    assert!(w.engine.is_active());
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(w.outbox.mail.lock().unwrap().len(), 1);

    w.engine.stop();
    assert!(!w.engine.is_active());
}
