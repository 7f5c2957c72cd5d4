//! Errors from signup, login and the password reset flow.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::MailError;

/// Why an account operation failed.
///
/// The first group is caused by the visitor's input and is shown back on the
/// form; the last three are infrastructure failures and are logged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] duenotes_core::EmailError),

    #[error("no account for this email")]
    UserNotFound,

    #[error("password does not match")]
    WrongPassword,

    #[error("email already registered")]
    UserAlreadyExists,

    /// Carries the message shown to the visitor.
    #[error("{0}")]
    WeakPassword(String),

    #[error("password confirmation differs")]
    PasswordMismatch,

    /// Wrong code, no pending code, or the code's TTL has passed.
    #[error("reset code rejected")]
    InvalidResetCode,

    /// Too many wrong guesses; the code was revoked.
    #[error("reset code revoked after repeated wrong guesses")]
    TooManyResetAttempts,

    /// The reset flow was entered out of order or its session data is gone.
    #[error("reset session missing or stale")]
    InvalidSessionState,

    #[error("could not send email: {0}")]
    EmailDelivery(#[from] MailError),

    #[error("store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("argon2 failure")]
    PasswordHash,
}
