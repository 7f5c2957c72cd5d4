//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Auth
//! GET  /signup                 - Signup page
//! POST /signup                 - Create account
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /logout                 - Logout, redirect home
//!
//! # Password reset
//! GET  /forgot-password        - Request a reset code
//! POST /forgot-password        - Email a reset code
//! GET  /verify-otp             - Code entry page
//! POST /verify-otp             - Check the code
//! GET  /reset-password         - New password page
//! POST /reset-password         - Set the new password
//!
//! # Notes (requires auth)
//! GET  /notes                  - List (?search=&category=&sort=)
//! GET  /notes/new              - Create form
//! POST /notes                  - Create
//! GET  /notes/edit/{id}        - Edit form
//! POST /notes/edit/{id}        - Update
//! POST /notes/delete/{id}      - Delete
//!
//! # Push API
//! GET  /api/push/public-key    - VAPID public key
//! POST /api/push/subscribe     - Store subscription (requires auth)
//! POST /api/push/unsubscribe   - Remove subscription (requires auth)
//!
//! # Assets
//! GET  /static/*               - CSS, JS, icons
//! GET  /service-worker.js      - Push service worker (root scope)
//! ```

pub mod auth;
pub mod home;
pub mod notes;
pub mod password_reset;
pub mod push;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, session::AppSessionLayer,
};
use crate::state::AppState;

/// Directory holding static assets, relative to the working directory.
pub const STATIC_DIR: &str = "crates/server/static";

/// Signup, login and logout.
///
/// Form posts are rate limited per client IP.
pub fn auth_routes(trust_proxy_headers: bool) -> Router<AppState> {
    let limited = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(password_reset::forgot_password))
        .route("/verify-otp", post(password_reset::verify_otp))
        .route("/reset-password", post(password_reset::reset_password))
        .layer(auth_rate_limiter(trust_proxy_headers));

    Router::new()
        .route("/signup", get(auth::signup_page))
        .route("/login", get(auth::login_page))
        .route("/logout", get(auth::logout))
        .route("/forgot-password", get(password_reset::forgot_password_page))
        .route("/verify-otp", get(password_reset::verify_otp_page))
        .route("/reset-password", get(password_reset::reset_password_page))
        .merge(limited)
}

/// Owner-scoped note pages.
pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notes::list).post(notes::create))
        .route("/new", get(notes::new_page))
        .route("/edit/{id}", get(notes::edit_page).post(notes::update))
        .route("/delete/{id}", post(notes::delete))
}

/// Push subscription API.
pub fn push_api_routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/public-key", get(push::public_key))
        .route("/subscribe", post(push::subscribe))
        .route("/unsubscribe", post(push::unsubscribe))
        .layer(api_rate_limiter(trust_proxy_headers))
}

/// All application routes, without state or middleware.
///
/// `trust_proxy_headers` selects how the rate limiters identify clients.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(home::health))
        .route("/health/ready", get(home::readiness))
        .merge(auth_routes(trust_proxy_headers))
        .nest("/notes", note_routes())
        .nest("/api/push", push_api_routes(trust_proxy_headers))
        .fallback(home::not_found)
}

/// The full application: routes, assets and the middleware stack.
pub fn app(state: AppState, session_layer: AppSessionLayer) -> Router {
    let trust_proxy_headers = state.config().trust_proxy_headers;

    Router::new()
        .merge(routes(trust_proxy_headers))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .route_service(
            "/service-worker.js",
            ServeFile::new(format!("{STATIC_DIR}/js/service-worker.js")),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(session_layer),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
