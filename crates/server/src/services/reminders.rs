//! Due-date reminder sweep.
//!
//! A scan selects notes due between the start of the current UTC day and
//! `window_days` later (exclusive), and sends one push message per note whose
//! owner has a subscription. Each delivery is independent: a failure is
//! logged and the scan moves on. Nothing is retried within a scan; a note
//! still inside the window is picked up again by the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use duenotes_core::NoteId;

use super::push::{PushError, PushSender};
use crate::db::{NoteRepository, NoteStore, RepositoryError};
use crate::models::Note;

/// Notification title shown by the browser.
pub const REMINDER_TITLE: &str = "Task Reminder";

/// Page opened when the notification is clicked.
pub const REMINDER_URL: &str = "/notes";

/// JSON payload delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderPayload {
    pub title: &'static str,
    pub body: String,
    pub icon: &'static str,
    pub badge: &'static str,
    pub data: ReminderData,
}

/// Deep-link data for the notification click handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderData {
    pub note_id: NoteId,
    pub url: &'static str,
}

impl ReminderPayload {
    #[must_use]
    pub fn for_note(note: &Note) -> Self {
        Self {
            title: REMINDER_TITLE,
            body: format!("\"{}\" is due soon!", note.title),
            icon: "/static/icons/icon-192x192.png",
            badge: "/static/icons/badge-72x72.png",
            data: ReminderData {
                note_id: note.id,
                url: REMINDER_URL,
            },
        }
    }
}

/// Half-open date range `[today, today + days)` in UTC.
#[must_use]
pub fn reminder_window(now: DateTime<Utc>, days: u32) -> (NaiveDate, NaiveDate) {
    let today = now.date_naive();
    let until = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    (today, until)
}

/// Outcome counts for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Notes inside the window.
    pub due: usize,
    /// Messages accepted by a push service.
    pub sent: usize,
    /// Notes whose owner has no subscription.
    pub unsubscribed: usize,
    /// Deliveries to subscriptions the push service no longer knows.
    pub gone: usize,
    /// Other delivery failures.
    pub failed: usize,
}

/// Runs reminder scans against a note store and a push sender.
pub struct ReminderScanner<'a, S, P> {
    notes: &'a S,
    sender: &'a P,
    window_days: u32,
}

impl<'a, S: NoteStore, P: PushSender> ReminderScanner<'a, S, P> {
    #[must_use]
    pub const fn new(notes: &'a S, sender: &'a P, window_days: u32) -> Self {
        Self {
            notes,
            sender,
            window_days,
        }
    }

    /// Scan once as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the due notes cannot be loaded. Delivery
    /// failures are counted in the report, not returned.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ScanReport, RepositoryError> {
        let (from, until) = reminder_window(now, self.window_days);
        let due = self.notes.notes_due_between(from, until).await?;

        let mut report = ScanReport {
            due: due.len(),
            ..ScanReport::default()
        };

        for item in due {
            let Some(subscription) = item.subscription else {
                report.unsubscribed += 1;
                continue;
            };

            let payload = ReminderPayload::for_note(&item.note);
            match self.sender.send(&subscription, &payload).await {
                Ok(()) => report.sent += 1,
                Err(PushError::Gone) => {
                    debug!(note_id = %item.note.id, "Skipping expired push subscription");
                    report.gone += 1;
                }
                Err(e) => {
                    warn!(note_id = %item.note.id, error = %e, "Failed to send reminder");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Start the periodic scan on its own task.
///
/// The first scan runs immediately, then once per `interval`.
pub fn spawn_scheduler<P>(
    pool: PgPool,
    sender: Arc<P>,
    interval: Duration,
    window_days: u32,
) -> JoinHandle<()>
where
    P: PushSender + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = interval.as_secs(),
            window_days, "Reminder scheduler started"
        );

        loop {
            ticker.tick().await;

            let notes = NoteRepository::new(&pool);
            let scanner = ReminderScanner::new(&notes, sender.as_ref(), window_days);
            match scanner.run_once(Utc::now()).await {
                Ok(report) if report.due > 0 => {
                    info!(
                        due = report.due,
                        sent = report.sent,
                        gone = report.gone,
                        failed = report.failed,
                        "Reminder scan complete"
                    );
                }
                Ok(_) => debug!("Reminder scan found nothing due"),
                Err(e) => {
                    tracing::error!(error = %e, "Reminder scan failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use duenotes_core::{Priority, UserId};

    use super::*;

    #[test]
    fn test_window_starts_at_today() {
        let now = Utc
            .with_ymd_and_hms(2026, 7, 14, 23, 30, 0)
            .single()
            .unwrap_or_default();
        let (from, until) = reminder_window(now, 2);
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 7, 14).unwrap_or_default());
        assert_eq!(until, NaiveDate::from_ymd_opt(2026, 7, 16).unwrap_or_default());
    }

    #[test]
    fn test_payload_shape() {
        let note = Note {
            id: NoteId::new(42),
            owner_id: UserId::new(1),
            title: "Pay rent".to_owned(),
            description: String::new(),
            category: "Home".to_owned(),
            due_date: None,
            priority: Some(Priority::High),
            created_at: Utc::now(),
            updated_at: None,
        };

        let json = serde_json::to_value(ReminderPayload::for_note(&note)).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({
                "title": "Task Reminder",
                "body": "\"Pay rent\" is due soon!",
                "icon": "/static/icons/icon-192x192.png",
                "badge": "/static/icons/badge-72x72.png",
                "data": { "noteId": 42, "url": "/notes" }
            })
        );
    }
}
