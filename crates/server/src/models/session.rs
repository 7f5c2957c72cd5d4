//! Session-related types.
//!
//! Types stored in the session for authentication and password-reset state.

use serde::{Deserialize, Serialize};

use duenotes_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Progress through the forgot-password sequence.
///
/// Absent from the session means the visitor has not started a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ResetStage {
    /// A code was emailed to `email` and has not been verified yet.
    AwaitingOtp { email: Email },
    /// The code for `email` was verified; a new password may be set.
    OtpVerified { email: Email },
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the password-reset stage.
    pub const RESET_STAGE: &str = "reset_stage";
}
