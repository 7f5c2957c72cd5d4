//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Handlers that cannot recover locally return
//! `Result<T, AppError>`; the response is the HTML error page.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::filters;
use crate::services::auth::AuthError;
use crate::services::notes::NoteError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<NoteError> for AppError {
    fn from(e: NoteError) -> Self {
        match e {
            NoteError::NotFound => Self::NotFound("note".to_owned()),
            NoteError::Validation { message, .. } => Self::BadRequest(message),
            NoteError::Repository(e) => Self::Database(e),
        }
    }
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl ErrorTemplate {
    /// Render the page for `status`, falling back to plain text.
    #[must_use]
    pub fn respond(status: StatusCode, message: impl Into<String>) -> Response {
        let page = Self {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_owned(),
            message: message.into(),
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, page.message).into_response()
            }
        }
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Session(_) | Self::Internal(_)
        ) || matches!(
            self,
            Self::Auth(
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::EmailDelivery(_)
            )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::UserNotFound | AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::PasswordMismatch
                | AuthError::InvalidResetCode => StatusCode::BAD_REQUEST,
                AuthError::TooManyResetAttempts => StatusCode::TOO_MANY_REQUESTS,
                AuthError::InvalidSessionState => StatusCode::UNAUTHORIZED,
                AuthError::EmailDelivery(_)
                | AuthError::Repository(_)
                | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            _ if self.is_server_error() => "Something went wrong. Please try again.".to_owned(),
            Self::Auth(err) => auth_message(err),
            Self::NotFound(_) => "The page you are looking for does not exist.".to_owned(),
            Self::Unauthorized(_) => "Please log in to continue.".to_owned(),
            Self::BadRequest(msg) => msg.clone(),
            _ => "Something went wrong. Please try again.".to_owned(),
        };

        ErrorTemplate::respond(status, message)
    }
}

/// User-facing text for an auth failure.
#[must_use]
pub fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::UserNotFound => "No user found".to_owned(),
        AuthError::WrongPassword => "Wrong password".to_owned(),
        AuthError::UserAlreadyExists => "An account with this email already exists".to_owned(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
        AuthError::PasswordMismatch => "Passwords do not match".to_owned(),
        AuthError::InvalidResetCode => "Invalid or expired OTP".to_owned(),
        AuthError::TooManyResetAttempts => {
            "Too many incorrect codes. Please request a new one.".to_owned()
        }
        AuthError::InvalidSessionState => "Session expired, please start again".to_owned(),
        AuthError::EmailDelivery(_) => "Failed to send email. Please try again.".to_owned(),
        AuthError::Repository(_) | AuthError::PasswordHash => {
            "Something went wrong. Please try again.".to_owned()
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
