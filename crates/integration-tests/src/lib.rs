//! Integration tests for duenotes.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p duenotes-integration-tests
//! ```
//!
//! The tests drive the services against [`MemoryStore`], which follows the
//! same semantics as the `PostgreSQL` repositories, with recording doubles
//! for outbound email and push. No database or network is needed.
//!
//! # Test Categories
//!
//! - `notes` - Owner-scoped CRUD, search, filter and sort
//! - `password_reset` - Forgot-password code flow
//! - `reminders` - Due-date push sweep

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use duenotes_core::{Email, UserId};
use duenotes_server::db::MemoryStore;
use duenotes_server::models::{PushKeys, PushSubscription};
use duenotes_server::services::auth::AuthService;
use duenotes_server::services::email::{MailError, Mailer};
use duenotes_server::services::push::{PushError, PushSender};

/// A fixed instant so date arithmetic in tests is deterministic.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
        .single()
        .unwrap_or_default()
}

/// Sign up `email` with a valid password and return the new user's id.
///
/// # Panics
///
/// Panics if signup fails.
pub async fn signup(store: &MemoryStore, email: &str) -> UserId {
    AuthService::new(store)
        .signup(email, "correct horse battery")
        .await
        .expect("signup succeeds")
        .id
}

/// A subscription with a distinct https endpoint.
#[must_use]
pub fn subscription(endpoint_id: &str) -> PushSubscription {
    PushSubscription {
        endpoint: format!("https://push.example.com/send/{endpoint_id}"),
        expiration_time: None,
        keys: PushKeys {
            p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA".to_owned(),
            auth: "tBHItJI5svbpez7KI4CCXg".to_owned(),
        },
    }
}

// =============================================================================
// Email
// =============================================================================

/// An email the [`RecordingMailer`] was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMail {
    ResetCode { to: String, code: String },
    PasswordChanged { to: String },
}

/// Which sends a [`RecordingMailer`] refuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum MailFailure {
    #[default]
    None,
    Everything,
    PasswordChanged,
}

/// [`Mailer`] that records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
    failure: MailFailure,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failure: MailFailure::Everything,
            ..Self::default()
        }
    }

    /// A mailer that sends reset codes but fails every password-changed notice.
    #[must_use]
    pub fn failing_confirmations() -> Self {
        Self {
            failure: MailFailure::PasswordChanged,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent reset code sent to `to`.
    #[must_use]
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|mail| match mail {
            SentMail::ResetCode { to: recipient, code } if recipient == to => Some(code),
            _ => None,
        })
    }

    fn record(&self, mail: SentMail) -> Result<(), MailError> {
        let refused = match self.failure {
            MailFailure::None => false,
            MailFailure::Everything => true,
            MailFailure::PasswordChanged => matches!(mail, SentMail::PasswordChanged { .. }),
        };
        if refused {
            return Err(MailError::NotConfigured);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail);
        Ok(())
    }
}

impl Mailer for RecordingMailer {
    async fn send_reset_code(&self, to: &Email, code: &str) -> Result<(), MailError> {
        self.record(SentMail::ResetCode {
            to: to.as_str().to_owned(),
            code: code.to_owned(),
        })
    }

    async fn send_password_changed(&self, to: &Email) -> Result<(), MailError> {
        self.record(SentMail::PasswordChanged {
            to: to.as_str().to_owned(),
        })
    }
}

// =============================================================================
// Push
// =============================================================================

/// A push message the [`RecordingPushSender`] delivered.
#[derive(Debug, Clone)]
pub struct SentPush {
    pub endpoint: String,
    pub payload: serde_json::Value,
}

/// [`PushSender`] that records payloads instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct RecordingPushSender {
    sent: Arc<Mutex<Vec<SentPush>>>,
    gone: Arc<Mutex<HashSet<String>>>,
    broken: Arc<Mutex<HashSet<String>>>,
}

impl RecordingPushSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer [`PushError::Gone`] for `endpoint` from now on.
    pub fn expire(&self, endpoint: &str) {
        self.gone
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_owned());
    }

    /// Answer [`PushError::Delivery`] for `endpoint` from now on.
    pub fn break_endpoint(&self, endpoint: &str) {
        self.broken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_owned());
    }

    #[must_use]
    pub fn sent(&self) -> Vec<SentPush> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PushSender for RecordingPushSender {
    async fn send<P: Serialize + Sync>(
        &self,
        subscription: &PushSubscription,
        payload: &P,
    ) -> Result<(), PushError> {
        let is_gone = self
            .gone
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&subscription.endpoint);
        if is_gone {
            return Err(PushError::Gone);
        }

        let is_broken = self
            .broken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&subscription.endpoint);
        if is_broken {
            return Err(PushError::Delivery("push service returned 500".to_owned()));
        }

        let payload = serde_json::to_value(payload)?;
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentPush {
                endpoint: subscription.endpoint.clone(),
                payload,
            });
        Ok(())
    }
}
