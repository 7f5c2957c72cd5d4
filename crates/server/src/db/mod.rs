//! Record stores for users and notes.
//!
//! # Database
//!
//! ## Tables
//!
//! - `users` - Accounts, outstanding reset codes, push subscriptions (JSONB)
//! - `notes` - Task notes, each owned by one user
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Store seams
//!
//! Handlers and services talk to [`UserStore`] and [`NoteStore`]. The
//! `PostgreSQL` repositories in [`users`] and [`notes`] are the production
//! implementations; [`MemoryStore`] backs tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p duenotes-cli -- migrate
//! ```

pub mod memory;
pub mod notes;
pub mod query;
pub mod users;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use duenotes_core::{Email, NoteId, UserId};

use crate::models::{Note, NoteFields, PushSubscription, ResetCode, User};

pub use memory::MemoryStore;
pub use notes::NoteRepository;
pub use query::{ALL_CATEGORIES, ListParams, NoteQuery, SortKey};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// A note inside the reminder window, joined to its owner's subscription.
#[derive(Debug, Clone)]
pub struct DueNote {
    pub note: Note,
    pub subscription: Option<PushSubscription>,
}

/// Account storage.
pub trait UserStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn get_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// The account and its stored password hash, for login.
    fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Replace any outstanding reset code.
    fn set_reset_code(
        &self,
        id: UserId,
        reset: &ResetCode,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Count a wrong guess against the outstanding reset code.
    ///
    /// Once `max_attempts` wrong guesses are counted the code is cleared.
    /// Returns the count so far, or `None` when no code is outstanding.
    fn record_failed_reset_attempt(
        &self,
        id: UserId,
        max_attempts: u32,
    ) -> impl Future<Output = Result<Option<u32>, RepositoryError>> + Send;

    /// Store a new password hash and clear the reset code in one write.
    fn complete_password_reset(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Set or clear the account's push subscription.
    fn set_push_subscription(
        &self,
        id: UserId,
        subscription: Option<&PushSubscription>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Note storage. Every per-note operation is scoped by owner.
pub trait NoteStore: Send + Sync {
    /// Notes selected and ordered by `query`.
    fn list_notes(
        &self,
        query: &NoteQuery,
    ) -> impl Future<Output = Result<Vec<Note>, RepositoryError>> + Send;

    /// Distinct categories in use by `owner`, sorted.
    fn list_categories(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    fn create_note(
        &self,
        owner: UserId,
        fields: &NoteFields,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Note, RepositoryError>> + Send;

    /// `None` when the note does not exist or belongs to someone else.
    fn get_note(
        &self,
        owner: UserId,
        id: NoteId,
    ) -> impl Future<Output = Result<Option<Note>, RepositoryError>> + Send;

    /// Overwrite the editable fields and stamp `updated_at = now`.
    ///
    /// `None` when the note does not exist or belongs to someone else.
    fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        fields: &NoteFields,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Note>, RepositoryError>> + Send;

    /// Returns `false` when nothing owned by `owner` had that id.
    fn delete_note(
        &self,
        owner: UserId,
        id: NoteId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Notes of all users with `from <= due_date < until`, ordered by due date.
    fn notes_due_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> impl Future<Output = Result<Vec<DueNote>, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}
