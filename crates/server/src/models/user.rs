//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Duration, Utc};

use duenotes_core::{Email, UserId};

use super::push::PushSubscription;

/// How long a password-reset code stays valid after it is issued.
pub const RESET_CODE_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed before the outstanding code is revoked.
pub const MAX_RESET_ATTEMPTS: u32 = 5;

/// A registered account (domain type).
///
/// Carries no password hash; only the login and reset paths load it.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, unique across users.
    pub email: Email,
    /// Outstanding password-reset code, if one was requested.
    pub reset: Option<ResetCode>,
    /// Browser push subscription, if the user enabled reminders.
    pub push_subscription: Option<PushSubscription>,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}

/// A one-time password-reset code and its expiry.
///
/// Code and expiry live in one value so they can only be set or cleared together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCode {
    /// Six ASCII digits.
    pub code: String,
    /// The code is rejected from this instant on.
    pub expires_at: DateTime<Utc>,
    /// Wrong codes submitted since this code was issued.
    pub failed_attempts: u32,
}

impl ResetCode {
    /// Create a code that expires [`RESET_CODE_TTL_MINUTES`] after `issued_at`.
    #[must_use]
    pub fn issue(code: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            code,
            expires_at: issued_at + Duration::minutes(RESET_CODE_TTL_MINUTES),
            failed_attempts: 0,
        }
    }

    /// Whether the code has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check a submitted code: it must match exactly (surrounding whitespace
    /// ignored) and `now` must be strictly before the expiry.
    #[must_use]
    pub fn accepts(&self, submitted: &str, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.code == submitted.trim()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap_or_default()
    }

    #[test]
    fn test_issue_sets_ten_minute_expiry() {
        let code = ResetCode::issue("123456".to_string(), issued());
        assert_eq!(code.expires_at - issued(), Duration::minutes(10));
    }

    #[test]
    fn test_accepts_matching_code_before_expiry() {
        let code = ResetCode::issue("123456".to_string(), issued());
        assert!(code.accepts("123456", issued()));
        assert!(code.accepts(" 123456 ", issued() + Duration::minutes(9)));
    }

    #[test]
    fn test_rejects_wrong_code() {
        let code = ResetCode::issue("123456".to_string(), issued());
        assert!(!code.accepts("654321", issued()));
        assert!(!code.accepts("", issued()));
    }

    #[test]
    fn test_rejects_at_and_after_expiry() {
        let code = ResetCode::issue("123456".to_string(), issued());
        let expiry = code.expires_at;
        assert!(code.accepts("123456", expiry - Duration::seconds(1)));
        assert!(!code.accepts("123456", expiry));
        assert!(!code.accepts("123456", expiry + Duration::seconds(1)));
    }
}
