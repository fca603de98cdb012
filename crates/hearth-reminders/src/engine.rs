//! Reminder engine — the polling loop that discovers and fires due reminders.
//!
//! Exactly one live loop is assumed. Two loops sharing a store can both
//! fetch the same due reminder before either marks it sent, which surfaces
//! as a duplicate notification; that race is accepted rather than corrected
//! with distributed locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use hearth_core::error::Result;

use crate::clock::Clock;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::reminder::ReminderKind;
use crate::scheduler::ReminderScheduler;
use crate::store::ReminderDb;

/// Result of firing one reminder during a pass.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub reminder_id: String,
    pub kind: ReminderKind,
    pub user_id: String,
    pub outcome: DispatchOutcome,
}

/// The dispatch loop, held as an owned handle so tests can run independent
/// instances instead of sharing process-wide state.
pub struct ReminderEngine {
    db: Arc<ReminderDb>,
    scheduler: ReminderScheduler,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderEngine {
    pub fn new(
        db: Arc<ReminderDb>,
        scheduler: ReminderScheduler,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            scheduler,
            dispatcher,
            clock,
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        }
    }

    /// One dispatch pass: fetch everything due now, deliver each, and mark
    /// each sent whatever the delivery outcome was. Also invokable directly
    /// (e.g. behind an authenticated admin trigger); running it concurrently
    /// with the loop is tolerated under the duplicate-delivery caveat.
    pub async fn process_pending_reminders(&self) -> Result<Vec<DispatchReport>> {
        let now = self.clock.now();
        let due = self.db.due(now)?;
        if !due.is_empty() {
            tracing::debug!(count = due.len(), "processing due reminders");
        }

        let mut reports = Vec::with_capacity(due.len());
        for reminder in &due {
            let outcome = self.dispatcher.dispatch(reminder).await;

            // Marked sent unconditionally: skips and channel failures are
            // terminal, never retried. mark_sent must land before the
            // re-arm below, or replace_pending would sweep this row away
            // as a stale pending reminder.
            if let Err(e) = self.db.mark_sent(&reminder.id, self.clock.now()) {
                tracing::warn!(reminder_id = %reminder.id, "failed to mark sent: {e}");
            }

            // Recurring kinds re-arm no matter what was (or wasn't) sent
            if reminder.kind.recurs() {
                self.scheduler.schedule_next(reminder.kind, &reminder.user_id);
            }

            reports.push(DispatchReport {
                reminder_id: reminder.id.clone(),
                kind: reminder.kind,
                user_id: reminder.user_id.clone(),
                outcome,
            });
        }
        Ok(reports)
    }

    /// Start the polling loop. No-op if already running. The first pass runs
    /// immediately so reminders that came due while the process was down are
    /// not delayed a full interval.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("reminder engine already running");
            return;
        }
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            "reminder engine started"
        );

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.poll_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = engine.stop.notified() => break,
                }
                if !engine.running.load(Ordering::SeqCst) {
                    break;
                }
                match engine.process_pending_reminders().await {
                    Ok(reports) => {
                        for report in &reports {
                            tracing::debug!(
                                reminder_id = %report.reminder_id,
                                kind = %report.kind,
                                outcome = ?report.outcome,
                                "reminder processed"
                            );
                        }
                    }
                    // Store outage: skip this pass, try again next tick
                    Err(e) => tracing::warn!("dispatch pass failed: {e}"),
                }
            }
            tracing::info!("reminder engine stopped");
        });

        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }
    }

    /// Halt future polling. An in-flight pass finishes on its own.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.stop.notify_waiters();
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
