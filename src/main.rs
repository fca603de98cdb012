//! Hearth reminder daemon.
//!
//! Wires the reminder engine together from config: SQLite reminder store,
//! read-only task/user directories over the host app database, and the SMTP
//! notification channel.

mod directories;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use hearth_channels::EmailChannel;
use hearth_core::HearthConfig;
use hearth_reminders::{
    Dispatcher, ReminderDb, ReminderEngine, ReminderScheduler, SchedulePolicy, SystemClock,
};

use directories::{SqliteTaskDirectory, SqliteUserDirectory};

#[derive(Parser)]
#[command(name = "hearth", about = "Hearth task reminder daemon", version)]
struct Cli {
    /// Config file path (default: ~/.hearth/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the polling loop until interrupted.
    Run,
    /// Run a single dispatch pass and exit.
    Tick,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HearthConfig::load_from(path)?,
        None => HearthConfig::load()?,
    };

    let engine = build_engine(&config).context("failed to build reminder engine")?;

    match cli.command {
        Command::Run => {
            engine.start();
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            tracing::info!("shutting down");
            engine.stop();
        }
        Command::Tick => {
            let reports = engine.process_pending_reminders().await?;
            tracing::info!(count = reports.len(), "dispatch pass complete");
            for report in reports {
                println!(
                    "{} {} user={} -> {:?}",
                    report.reminder_id, report.kind, report.user_id, report.outcome
                );
            }
        }
    }

    Ok(())
}

fn build_engine(config: &HearthConfig) -> anyhow::Result<Arc<ReminderEngine>> {
    let db = Arc::new(ReminderDb::open(PathBuf::from(&config.reminders.db_path).as_path())?);
    let clock = Arc::new(SystemClock);

    let app_db = PathBuf::from(&config.reminders.app_db_path);
    let tasks = Arc::new(SqliteTaskDirectory::open(&app_db)?);
    let users = Arc::new(SqliteUserDirectory::open(&app_db)?);
    let channel = Arc::new(EmailChannel::new(config.email.clone()));

    let policy = SchedulePolicy {
        digest_hour: config.reminders.digest_hour,
        overdue_hour: config.reminders.overdue_hour,
    };
    let scheduler = ReminderScheduler::new(db.clone(), clock.clone(), policy);
    let dispatcher = Dispatcher::new(tasks, users, channel, clock.clone());

    Ok(Arc::new(ReminderEngine::new(
        db,
        scheduler,
        dispatcher,
        clock,
        Duration::from_secs(config.reminders.poll_interval_secs),
    )))
}
