//! Per-kind reminder delivery.
//!
//! Each kind loads its referenced data, checks eligibility, renders a
//! message, and hands it to the notification channel. Everything short of
//! a send is a skip, not an error: a deleted task, a completed task, or an
//! opted-out user simply means there is nothing to say.

use std::sync::Arc;

use chrono::{Days, NaiveTime};

use hearth_core::channel::NotificationChannel;

use crate::clock::Clock;
use crate::directory::{Task, TaskDirectory, User, UserDirectory};
use crate::reminder::{Reminder, ReminderKind};

/// What one dispatch attempt produced. Lets callers (and tests) see *why*
/// a reminder yielded no notification instead of scraping logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The channel accepted the message.
    Sent,
    /// Eligibility failed; nothing was sent and nothing is wrong.
    Skipped(SkipReason),
    /// The channel rejected the message or was unreachable. Not retried.
    ChannelFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UserMissing,
    OptedOut,
    TaskMissing,
    TaskCompleted,
    /// The recurring sweep found no matching tasks; nothing to say today.
    NothingDue,
    /// A directory lookup failed. Treated like any other skip.
    LookupFailed,
}

/// Routes a due reminder to its kind-specific delivery path.
pub struct Dispatcher {
    tasks: Arc<dyn TaskDirectory>,
    users: Arc<dyn UserDirectory>,
    channel: Arc<dyn NotificationChannel>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        tasks: Arc<dyn TaskDirectory>,
        users: Arc<dyn UserDirectory>,
        channel: Arc<dyn NotificationChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            users,
            channel,
            clock,
        }
    }

    /// Deliver one due reminder. Never returns an error; every failure mode
    /// collapses into the outcome so the engine can mark the reminder sent
    /// regardless.
    pub async fn dispatch(&self, reminder: &Reminder) -> DispatchOutcome {
        match reminder.kind {
            ReminderKind::TaskReminder => self.task_reminder(reminder).await,
            ReminderKind::OverdueCheck => self.overdue_check(reminder).await,
            ReminderKind::DailyDigest => self.daily_digest(reminder).await,
        }
    }

    async fn task_reminder(&self, reminder: &Reminder) -> DispatchOutcome {
        let user = match self.eligible_user(&reminder.user_id, |o| o.task_reminders) {
            Ok(user) => user,
            Err(skip) => return DispatchOutcome::Skipped(skip),
        };

        let task = match self.tasks.find_by_id(&reminder.task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::debug!(task_id = %reminder.task_id, "task gone; skipping reminder");
                return DispatchOutcome::Skipped(SkipReason::TaskMissing);
            }
            Err(e) => {
                tracing::warn!(task_id = %reminder.task_id, "task lookup failed: {e}");
                return DispatchOutcome::Skipped(SkipReason::LookupFailed);
            }
        };
        if task.completed {
            tracing::debug!(task_id = %task.id, "task already done; skipping reminder");
            return DispatchOutcome::Skipped(SkipReason::TaskCompleted);
        }

        let subject = format!("Reminder: {}", task.title);
        let (html, text) = render_task(&user, &task);
        self.deliver(&user, &subject, &html, &text, reminder.kind)
            .await
    }

    async fn overdue_check(&self, reminder: &Reminder) -> DispatchOutcome {
        let user = match self.eligible_user(&reminder.user_id, |o| o.overdue_reminders) {
            Ok(user) => user,
            Err(skip) => return DispatchOutcome::Skipped(skip),
        };

        let overdue = match self.tasks.find_overdue(&user.user_id, self.clock.now()) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, "overdue lookup failed: {e}");
                return DispatchOutcome::Skipped(SkipReason::LookupFailed);
            }
        };
        if overdue.is_empty() {
            return DispatchOutcome::Skipped(SkipReason::NothingDue);
        }

        let subject = format!(
            "You have {} overdue task{}",
            overdue.len(),
            if overdue.len() == 1 { "" } else { "s" }
        );
        let (html, text) = render_task_list(
            &user,
            "These tasks are past their due date:",
            &overdue,
        );
        self.deliver(&user, &subject, &html, &text, reminder.kind)
            .await
    }

    async fn daily_digest(&self, reminder: &Reminder) -> DispatchOutcome {
        let user = match self.eligible_user(&reminder.user_id, |o| o.daily_digest) {
            Ok(user) => user,
            Err(skip) => return DispatchOutcome::Skipped(skip),
        };

        // [start of today, start of day-after-tomorrow): everything due
        // today or tomorrow on the engine's clock
        let today = self.clock.now().date_naive();
        let start = today.and_time(NaiveTime::MIN).and_utc();
        let end = (today + Days::new(2)).and_time(NaiveTime::MIN).and_utc();

        let upcoming = match self.tasks.find_due_within(&user.user_id, start, end) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, "digest lookup failed: {e}");
                return DispatchOutcome::Skipped(SkipReason::LookupFailed);
            }
        };
        if upcoming.is_empty() {
            return DispatchOutcome::Skipped(SkipReason::NothingDue);
        }

        let subject = format!(
            "Your day ahead: {} task{} coming up",
            upcoming.len(),
            if upcoming.len() == 1 { "" } else { "s" }
        );
        let (html, text) = render_task_list(
            &user,
            "Here's what's due today and tomorrow:",
            &upcoming,
        );
        self.deliver(&user, &subject, &html, &text, reminder.kind)
            .await
    }

    /// Load the recipient and apply the per-kind opt-out flag.
    fn eligible_user(
        &self,
        user_id: &str,
        opted_out: impl Fn(&crate::directory::OptOuts) -> bool,
    ) -> Result<User, SkipReason> {
        match self.users.find_by_user_id(user_id) {
            Ok(Some(user)) => {
                if opted_out(&user.opt_outs) {
                    tracing::debug!(user_id, "user opted out; skipping");
                    Err(SkipReason::OptedOut)
                } else {
                    Ok(user)
                }
            }
            Ok(None) => {
                tracing::debug!(user_id, "user gone; skipping");
                Err(SkipReason::UserMissing)
            }
            Err(e) => {
                tracing::warn!(user_id, "user lookup failed: {e}");
                Err(SkipReason::LookupFailed)
            }
        }
    }

    async fn deliver(
        &self,
        user: &User,
        subject: &str,
        html: &str,
        text: &str,
        kind: ReminderKind,
    ) -> DispatchOutcome {
        match self
            .channel
            .send(&user.email, subject, html, text, &[kind.as_str()])
            .await
        {
            Ok(()) => {
                tracing::info!(user_id = %user.user_id, kind = %kind, subject, "notification sent");
                DispatchOutcome::Sent
            }
            Err(e) => {
                // Best-effort: log and move on, the engine still marks the
                // reminder sent
                tracing::warn!(user_id = %user.user_id, kind = %kind, "channel send failed: {e}");
                DispatchOutcome::ChannelFailed(e.to_string())
            }
        }
    }
}

fn render_task(user: &User, task: &Task) -> (String, String) {
    let due = task.due_at.format("%A, %B %e at %H:%M");
    let html = format!(
        "<p>Hi {name},</p>\
         <p>A friendly nudge about <strong>{title}</strong>, due {due}.</p>\
         {desc}\
         <p>— Hearth</p>",
        name = user.name,
        title = task.title,
        due = due,
        desc = if task.description.is_empty() {
            String::new()
        } else {
            format!("<p>{}</p>", task.description)
        },
    );
    let text = format!(
        "Hi {},\n\nA friendly nudge about \"{}\", due {}.\n{}\n— Hearth\n",
        user.name,
        task.title,
        due,
        if task.description.is_empty() {
            String::new()
        } else {
            format!("\n{}\n", task.description)
        },
    );
    (html, text)
}

fn render_task_list(user: &User, lede: &str, tasks: &[Task]) -> (String, String) {
    let mut items_html = String::new();
    let mut items_text = String::new();
    for task in tasks {
        let due = task.due_at.format("%b %e");
        items_html.push_str(&format!(
            "<li><strong>{}</strong> ({}, due {})</li>",
            task.title,
            task.priority.as_str(),
            due
        ));
        items_text.push_str(&format!(
            "  - {} ({}, due {})\n",
            task.title,
            task.priority.as_str(),
            due
        ));
    }
    let html = format!(
        "<p>Hi {name},</p><p>{lede}</p><ul>{items}</ul><p>— Hearth</p>",
        name = user.name,
        lede = lede,
        items = items_html,
    );
    let text = format!(
        "Hi {},\n\n{}\n{}\n— Hearth\n",
        user.name, lede, items_text
    );
    (html, text)
}
