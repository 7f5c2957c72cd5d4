//! One-off reminder sweep.
//!
//! # Usage
//!
//! ```bash
//! duenotes-cli reminders scan
//! ```
//!
//! Runs the same scan the server runs hourly, once, and logs the outcome.
//! Requires `DATABASE_URL` and the `VAPID_*` variables.

use chrono::Utc;

use duenotes_server::config::{ConfigError, PushConfig, ReminderConfig};
use duenotes_server::db::{NoteRepository, RepositoryError};
use duenotes_server::services::push::{PushError, VapidPushSender};
use duenotes_server::services::reminders::ReminderScanner;

use super::{ConnectError, connect};

/// Errors that can occur during a sweep.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY must be set")]
    PushNotConfigured,

    #[error("Push client error: {0}")]
    Push(#[from] PushError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Scan for due notes and send reminders once.
///
/// # Errors
///
/// Returns `ReminderError` if configuration is missing or the due notes
/// cannot be loaded. Individual delivery failures are only logged.
pub async fn scan() -> Result<(), ReminderError> {
    let pool = connect().await?;

    let push = PushConfig::from_env()?.ok_or(ReminderError::PushNotConfigured)?;
    let reminders = ReminderConfig::from_env()?;
    let sender = VapidPushSender::new(&push)?;

    let notes = NoteRepository::new(&pool);
    let report = ReminderScanner::new(&notes, &sender, reminders.window_days)
        .run_once(Utc::now())
        .await?;

    tracing::info!(
        due = report.due,
        sent = report.sent,
        unsubscribed = report.unsubscribed,
        gone = report.gone,
        failed = report.failed,
        "Reminder scan complete"
    );
    Ok(())
}
