//! # Hearth Reminders
//!
//! Task-reminder scheduling and delivery engine for Hearth.
//! Best-effort by design: no retries, no distributed locking, no
//! exactly-once guarantees — a missed notification is always preferable
//! to a crashed or blocked host process.
//!
//! ## Architecture
//! ```text
//! app action ──► ReminderScheduler ──► ReminderDb (SQLite)
//!                  (supersede + insert)      ▲
//!                                            │ due(now)
//! ReminderEngine (tokio interval) ───────────┘
//!   └── per due reminder → Dispatcher
//!         ├── task-reminder: task exists + incomplete? → send
//!         ├── overdue-check: overdue tasks? → send, re-arm tomorrow 18:00
//!         └── daily-digest:  due today/tomorrow? → send, re-arm tomorrow 08:00
//!       then mark sent — unconditionally, whatever the outcome
//! ```

pub mod clock;
pub mod directory;
pub mod dispatch;
pub mod engine;
pub mod reminder;
pub mod scheduler;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{OptOuts, Priority, Task, TaskDirectory, User, UserDirectory};
pub use dispatch::{DispatchOutcome, Dispatcher, SkipReason};
pub use engine::{DispatchReport, ReminderEngine};
pub use reminder::{Reminder, ReminderKind};
pub use scheduler::{ReminderScheduler, SchedulePolicy};
pub use store::ReminderDb;
