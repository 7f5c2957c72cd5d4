//! Web Push subscription API.
//!
//! JSON endpoints used by `static/js/notifications.js`. Errors are returned
//! as `{"error": "..."}` bodies.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::db::{UserRepository, UserStore};
use crate::middleware::RequireAuth;
use crate::models::PushSubscription;
use crate::state::AppState;

/// Successful subscription change.
#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub success: bool,
    pub message: &'static str,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Unwrap a posted subscription, turning a bad body or bad fields into a
/// JSON error response.
fn accept_subscription(
    payload: Result<Json<PushSubscription>, JsonRejection>,
) -> Result<PushSubscription, Response> {
    let Json(subscription) = payload.map_err(|rejection| {
        error_response(
            rejection.status(),
            &format!("Invalid subscription: {}", rejection.body_text()),
        )
    })?;

    subscription.validate().map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid subscription: {e}"))
    })?;

    Ok(subscription)
}

/// Application server key for `PushManager.subscribe()`.
pub async fn public_key(State(state): State<AppState>) -> Response {
    match &state.config().push {
        Some(push) => Json(json!({ "publicKey": push.public_key })).into_response(),
        None => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "VAPID public key not configured",
        ),
    }
}

/// Store the browser's subscription for the current user.
///
/// Replaces any earlier subscription; one browser per user receives reminders.
pub async fn subscribe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<PushSubscription>, JsonRejection>,
) -> Response {
    let subscription = match accept_subscription(payload) {
        Ok(subscription) => subscription,
        Err(response) => {
            tracing::warn!(
                user_id = %user.id,
                status = %response.status(),
                "Rejected push subscription"
            );
            return response;
        }
    };

    let users = UserRepository::new(state.pool());
    match users.set_push_subscription(user.id, Some(&subscription)).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "Push subscription saved");
            Json(PushResponse {
                success: true,
                message: "Subscribed to notifications!",
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to save push subscription");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to subscribe")
        }
    }
}

/// Forget the current user's subscription.
pub async fn unsubscribe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Response {
    let users = UserRepository::new(state.pool());
    match users.set_push_subscription(user.id, None).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "Push subscription removed");
            Json(PushResponse {
                success: true,
                message: "Unsubscribed from notifications",
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to remove push subscription");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to unsubscribe")
        }
    }
}
