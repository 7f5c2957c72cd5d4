//! Forgot-password, verify-code and reset-password route handlers.
//!
//! Progress is kept in the session as a [`ResetStage`]. Pages for a later
//! step redirect back to `/forgot-password` when the session is not at that
//! step. Failures re-render the current step with a message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;

use duenotes_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, auth_message};
use crate::filters;
use crate::models::{ResetStage, session_keys};
use crate::services::auth::{AuthError, MIN_PASSWORD_LENGTH, PasswordResetService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpForm {
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "confirmPassword")]
    pub confirm_password: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<String>,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_otp.html")]
pub struct VerifyOtpTemplate {
    pub error: Option<String>,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub error: Option<String>,
    pub min_password_length: usize,
}

// =============================================================================
// Session helpers
// =============================================================================

/// Current reset stage; an unreadable entry counts as none.
async fn reset_stage(session: &Session) -> Option<ResetStage> {
    session
        .get::<ResetStage>(session_keys::RESET_STAGE)
        .await
        .ok()
        .flatten()
}

async fn set_reset_stage(
    session: &Session,
    stage: &ResetStage,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::RESET_STAGE, stage).await
}

async fn clear_reset_stage(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<ResetStage>(session_keys::RESET_STAGE)
        .await?;
    Ok(())
}

fn restart() -> Response {
    Redirect::to("/forgot-password").into_response()
}

// =============================================================================
// Forgot password
// =============================================================================

/// Display the forgot-password page.
pub async fn forgot_password_page() -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: None,
        email: String::new(),
    }
}

/// Issue and email a reset code.
///
/// Only advances to code entry once the email has been sent. With
/// `RESET_CONCEAL_UNKNOWN_EMAIL` set, an unknown address advances as well so
/// the response does not reveal whether the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response, AppError> {
    // A new request abandons any earlier progress.
    clear_reset_stage(&session).await?;

    let users = UserRepository::new(state.pool());
    let service = PasswordResetService::new(&users, state.mailer());

    let error = match service.request_code(&form.email, Utc::now()).await {
        Ok(email) => {
            set_reset_stage(&session, &ResetStage::AwaitingOtp { email }).await?;
            return Ok(Redirect::to("/verify-otp").into_response());
        }
        Err(AuthError::UserNotFound) => {
            if state.config().conceal_unknown_reset_email
                && let Ok(email) = Email::parse(&form.email)
            {
                set_reset_stage(&session, &ResetStage::AwaitingOtp { email }).await?;
                return Ok(Redirect::to("/verify-otp").into_response());
            }
            "No account found with that email".to_owned()
        }
        Err(e @ AuthError::EmailDelivery(_)) => {
            tracing::error!(error = %e, "Failed to send reset code");
            "Failed to send OTP. Please try again.".to_owned()
        }
        Err(e) => {
            tracing::error!(error = %e, "Password reset request failed");
            auth_message(&e)
        }
    };

    Ok(ForgotPasswordTemplate {
        error: Some(error),
        email: form.email,
    }
    .into_response())
}

// =============================================================================
// Verify code
// =============================================================================

/// Display the code entry page.
pub async fn verify_otp_page(session: Session) -> Response {
    match reset_stage(&session).await {
        Some(ResetStage::AwaitingOtp { email }) => VerifyOtpTemplate {
            error: None,
            email: email.into_inner(),
        }
        .into_response(),
        _ => restart(),
    }
}

/// Check the submitted code.
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<VerifyOtpForm>,
) -> Result<Response, AppError> {
    let Some(ResetStage::AwaitingOtp { email }) = reset_stage(&session).await else {
        return Ok(restart());
    };

    let users = UserRepository::new(state.pool());
    let service = PasswordResetService::new(&users, state.mailer());

    match service.verify_code(&email, &form.otp, Utc::now()).await {
        Ok(()) => {
            set_reset_stage(&session, &ResetStage::OtpVerified { email }).await?;
            Ok(Redirect::to("/reset-password").into_response())
        }
        Err(e @ AuthError::TooManyResetAttempts) => {
            clear_reset_stage(&session).await?;
            Ok(ForgotPasswordTemplate {
                error: Some(auth_message(&e)),
                email: email.into_inner(),
            }
            .into_response())
        }
        Err(e) => {
            if !matches!(e, AuthError::InvalidResetCode) {
                tracing::error!(error = %e, "Reset code verification failed");
            }
            Ok(VerifyOtpTemplate {
                error: Some(auth_message(&e)),
                email: email.into_inner(),
            }
            .into_response())
        }
    }
}

// =============================================================================
// Reset password
// =============================================================================

/// Display the new password page.
pub async fn reset_password_page(session: Session) -> Response {
    match reset_stage(&session).await {
        Some(ResetStage::OtpVerified { .. }) => ResetPasswordTemplate {
            error: None,
            min_password_length: MIN_PASSWORD_LENGTH,
        }
        .into_response(),
        _ => restart(),
    }
}

/// Set the new password.
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    let Some(ResetStage::OtpVerified { email }) = reset_stage(&session).await else {
        return Ok(restart());
    };

    let users = UserRepository::new(state.pool());
    let service = PasswordResetService::new(&users, state.mailer());

    match service
        .reset_password(&email, &form.password, &form.confirm_password)
        .await
    {
        Ok(()) => {
            clear_reset_stage(&session).await?;
            Ok(Redirect::to("/login?success=password_reset").into_response())
        }
        Err(AuthError::InvalidSessionState | AuthError::UserNotFound) => {
            clear_reset_stage(&session).await?;
            Ok(restart())
        }
        Err(e) => {
            if !matches!(e, AuthError::PasswordMismatch | AuthError::WeakPassword(_)) {
                tracing::error!(error = %e, "Password reset failed");
            }
            Ok(ResetPasswordTemplate {
                error: Some(auth_message(&e)),
                min_password_length: MIN_PASSWORD_LENGTH,
            }
            .into_response())
        }
    }
}
