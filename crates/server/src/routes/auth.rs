//! Signup, login and logout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::{AppError, auth_message, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_session, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login and signup form data.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Query parameters carrying a notice code from a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub success: Option<String>,
}

/// Text for a notice code; unknown codes show nothing.
#[must_use]
pub fn notice_text(code: Option<&str>) -> Option<&'static str> {
    match code? {
        "registered" => Some("Account created. Please log in."),
        "password_reset" => Some("Password reset successfully. Please log in with your new password."),
        _ => None,
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<&'static str>,
    pub email: String,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
    pub email: String,
    pub min_password_length: usize,
}

// =============================================================================
// Signup
// =============================================================================

/// Display the signup page.
pub async fn signup_page(OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/notes").into_response();
    }

    SignupTemplate {
        error: None,
        email: String::new(),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
    .into_response()
}

/// Handle signup form submission.
pub async fn signup(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    let users = UserRepository::new(state.pool());

    match AuthService::new(&users)
        .signup(&form.email, &form.password)
        .await
    {
        Ok(_) => Redirect::to("/login?success=registered").into_response(),
        Err(e) => {
            log_auth_failure("Signup", &e);
            SignupTemplate {
                error: Some(auth_message(&e)),
                email: form.email,
                min_password_length: MIN_PASSWORD_LENGTH,
            }
            .into_response()
        }
    }
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NoticeQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/notes").into_response();
    }

    LoginTemplate {
        error: None,
        success: notice_text(query.success.as_deref()),
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let users = UserRepository::new(state.pool());

    match AuthService::new(&users)
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email,
            };
            set_current_user(&session, &current).await?;
            set_sentry_user(&current.id, Some(current.email.as_str()));
            tracing::info!(user_id = %current.id, "User logged in");

            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            log_auth_failure("Login", &e);
            Ok(LoginTemplate {
                error: Some(auth_message(&e)),
                success: None,
                email: form.email,
            }
            .into_response())
        }
    }
}

/// Log out and return to the home page.
///
/// A session store failure is logged; the browser is redirected either way.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_session(&session).await {
        tracing::error!(error = %e, "Failed to delete session");
    }
    clear_sentry_user();
    Redirect::to("/")
}

/// Expected failures are logged at `warn`, store failures at `error`.
fn log_auth_failure(action: &str, e: &AuthError) {
    match e {
        AuthError::Repository(_) | AuthError::PasswordHash => {
            tracing::error!(action, error = %e, "Auth request failed");
        }
        _ => tracing::warn!(action, error = %e, "Auth request rejected"),
    }
}
