//! User repository for database operations.
//!
//! Queries are checked at runtime (`sqlx::query_as`) and decoded through
//! private row types.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use duenotes_core::{Email, UserId};

use super::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::{PushSubscription, ResetCode, User};

// =============================================================================
// Internal Row Types
// =============================================================================

const USER_COLUMNS: &str = "id, email, reset_code, reset_code_expires_at, reset_attempts, \
     push_subscription, created_at";

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    reset_code: Option<String>,
    reset_code_expires_at: Option<DateTime<Utc>>,
    reset_attempts: i32,
    push_subscription: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let reset = match (row.reset_code, row.reset_code_expires_at) {
            (Some(code), Some(expires_at)) => Some(ResetCode {
                code,
                expires_at,
                failed_attempts: attempts_from_db(row.reset_attempts)?,
            }),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "user {} has a half-set reset code",
                    row.id
                )));
            }
        };

        let push_subscription = row
            .push_subscription
            .map(serde_json::from_value::<PushSubscription>)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid push subscription: {e}"))
            })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            reset,
            push_subscription,
            created_at: row.created_at,
        })
    }
}

fn attempts_from_db(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::DataCorruption(format!("negative reset attempt count: {value}"))
    })
}

fn attempts_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Row type for the login lookup.
#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for UserRepository<'_> {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .bind(password_hash)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserWithHashRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn set_reset_code(&self, id: UserId, reset: &ResetCode) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET reset_code = $2, reset_code_expires_at = $3, reset_attempts = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&reset.code)
        .bind(reset.expires_at)
        .bind(attempts_to_db(reset.failed_attempts))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_failed_reset_attempt(
        &self,
        id: UserId,
        max_attempts: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        // SET expressions see the row as it was before the update.
        let attempts = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE users
            SET reset_attempts = reset_attempts + 1,
                reset_code = CASE WHEN reset_attempts + 1 >= $2 THEN NULL ELSE reset_code END,
                reset_code_expires_at = CASE
                    WHEN reset_attempts + 1 >= $2 THEN NULL
                    ELSE reset_code_expires_at
                END
            WHERE id = $1 AND reset_code IS NOT NULL
            RETURNING reset_attempts
            ",
        )
        .bind(id)
        .bind(attempts_to_db(max_attempts))
        .fetch_optional(self.pool)
        .await?;

        attempts.map(attempts_from_db).transpose()
    }

    async fn complete_password_reset(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2,
                reset_code = NULL,
                reset_code_expires_at = NULL,
                reset_attempts = 0
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_push_subscription(
        &self,
        id: UserId,
        subscription: Option<&PushSubscription>,
    ) -> Result<(), RepositoryError> {
        let value = subscription
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable subscription: {e}")))?;

        let result = sqlx::query("UPDATE users SET push_subscription = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
