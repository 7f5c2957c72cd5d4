//! Emailed-code password reset.
//!
//! Each step is a separate request; the route layer keeps the caller's
//! progress in the session as a [`ResetStage`](crate::models::ResetStage)
//! and only calls a step when the stage allows it.

use chrono::{DateTime, Utc};

use duenotes_core::Email;

use super::{AuthError, hash_password, validate_password};
use crate::db::UserStore;
use crate::models::{MAX_RESET_ATTEMPTS, ResetCode};
use crate::services::email::{Mailer, generate_reset_code};

/// Password reset steps.
pub struct PasswordResetService<'a, U, M> {
    users: &'a U,
    mailer: &'a M,
}

impl<'a, U: UserStore, M: Mailer> PasswordResetService<'a, U, M> {
    #[must_use]
    pub const fn new(users: &'a U, mailer: &'a M) -> Self {
        Self { users, mailer }
    }

    /// Issue a reset code for `email` and send it.
    ///
    /// The code is stored before sending, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has that email, and
    /// `AuthError::EmailDelivery` if the code could not be sent.
    pub async fn request_code(&self, email: &str, now: DateTime<Utc>) -> Result<Email, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let reset = ResetCode::issue(generate_reset_code(), now);
        self.users.set_reset_code(user.id, &reset).await?;

        self.mailer.send_reset_code(&user.email, &reset.code).await?;

        tracing::info!(user_id = %user.id, "Password reset code sent");
        Ok(user.email)
    }

    /// Check a submitted code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetCode` unless the account has an
    /// outstanding code equal to `code` and `now` is before its expiry.
    /// Each wrong guess against a live code is counted; the guess that
    /// reaches [`MAX_RESET_ATTEMPTS`] revokes the code and returns
    /// `AuthError::TooManyResetAttempts`.
    pub async fn verify_code(
        &self,
        email: &Email,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::InvalidResetCode)?;

        match &user.reset {
            Some(reset) if reset.accepts(code, now) => Ok(()),
            Some(reset) if !reset.is_expired(now) => {
                let attempts = self
                    .users
                    .record_failed_reset_attempt(user.id, MAX_RESET_ATTEMPTS)
                    .await?;
                if attempts.is_some_and(|n| n >= MAX_RESET_ATTEMPTS) {
                    tracing::warn!(
                        user_id = %user.id,
                        "Reset code revoked after repeated wrong guesses"
                    );
                    return Err(AuthError::TooManyResetAttempts);
                }
                Err(AuthError::InvalidResetCode)
            }
            _ => Err(AuthError::InvalidResetCode),
        }
    }

    /// Set the new password and clear the reset code.
    ///
    /// The confirmation email is best-effort; a send failure is logged and
    /// does not undo the change.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for
    /// bad input, and `AuthError::InvalidSessionState` if the account has no
    /// outstanding reset code.
    pub async fn reset_password(
        &self,
        email: &Email,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;

        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.reset.is_none() {
            return Err(AuthError::InvalidSessionState);
        }

        let password_hash = hash_password(password)?;
        self.users
            .complete_password_reset(user.id, &password_hash)
            .await?;
        tracing::info!(user_id = %user.id, "Password reset completed");

        if let Err(e) = self.mailer.send_password_changed(&user.email).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send password changed email");
        }

        Ok(())
    }
}
