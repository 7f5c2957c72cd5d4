//! Request middleware and extractors.
//!
//! Outermost first, a request passes through Sentry, `TraceLayer`, the
//! request id layer and the session layer. Auth form posts and the push API
//! additionally sit behind per-IP governor limits. `RequireAuth` and
//! `OptionalAuth` read the logged-in user from the session.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_session, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
