//! Note repository for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::warn;

use duenotes_core::{NoteId, Priority, UserId};

use super::{DueNote, NoteQuery, NoteStore, RepositoryError};
use crate::models::{Note, NoteFields, PushSubscription};

// =============================================================================
// Internal Row Types
// =============================================================================

const NOTE_COLUMNS: &str =
    "id, user_id, title, description, category, due_date, priority, created_at, updated_at";

/// Internal row type for `PostgreSQL` note queries.
#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: i32,
    user_id: i32,
    title: String,
    description: String,
    category: String,
    due_date: Option<NaiveDate>,
    priority: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        // Unknown labels are kept readable and rank last.
        let priority = row.priority.as_deref().and_then(|p| Priority::parse(p).ok());

        Self {
            id: NoteId::new(row.id),
            owner_id: UserId::new(row.user_id),
            title: row.title,
            description: row.description,
            category: row.category,
            due_date: row.due_date,
            priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Reminder scan row: a note plus its owner's subscription.
#[derive(Debug, sqlx::FromRow)]
struct DueNoteRow {
    #[sqlx(flatten)]
    note: NoteRow,
    push_subscription: Option<serde_json::Value>,
}

impl From<DueNoteRow> for DueNote {
    fn from(row: DueNoteRow) -> Self {
        let note = Note::from(row.note);
        // A malformed subscription only disables delivery for this owner.
        let subscription = row.push_subscription.and_then(|value| {
            serde_json::from_value::<PushSubscription>(value)
                .inspect_err(|e| {
                    warn!(owner_id = %note.owner_id, error = %e, "Ignoring malformed push subscription");
                })
                .ok()
        });

        Self { note, subscription }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for note database operations.
pub struct NoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NoteRepository<'a> {
    /// Create a new note repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl NoteStore for NoteRepository<'_> {
    async fn list_notes(&self, query: &NoteQuery) -> Result<Vec<Note>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {NOTE_COLUMNS} FROM notes"));
        query.push_sql(&mut qb);

        let rows = qb.build_query_as::<NoteRow>().fetch_all(self.pool).await?;

        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn list_categories(&self, owner: UserId) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT category
            FROM notes
            WHERE user_id = $1
            ORDER BY category
            ",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    async fn create_note(
        &self,
        owner: UserId,
        fields: &NoteFields,
        now: DateTime<Utc>,
    ) -> Result<Note, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO notes (user_id, title, description, category, due_date, priority, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {NOTE_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(owner)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.category)
            .bind(fields.due_date)
            .bind(fields.priority.as_str())
            .bind(now)
            .fetch_one(self.pool)
            .await?;

        Ok(row.into())
    }

    async fn get_note(&self, owner: UserId, id: NoteId) -> Result<Option<Note>, RepositoryError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Note::from))
    }

    async fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        fields: &NoteFields,
        now: DateTime<Utc>,
    ) -> Result<Option<Note>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE notes
            SET title = $3, description = $4, category = $5,
                due_date = $6, priority = $7, updated_at = $8
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTE_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.category)
            .bind(fields.due_date)
            .bind(fields.priority.as_str())
            .bind(now)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Note::from))
    }

    async fn delete_note(&self, owner: UserId, id: NoteId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn notes_due_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DueNote>, RepositoryError> {
        let rows = sqlx::query_as::<_, DueNoteRow>(
            r"
            SELECT n.id, n.user_id, n.title, n.description, n.category,
                   n.due_date, n.priority, n.created_at, n.updated_at,
                   u.push_subscription
            FROM notes n
            JOIN users u ON u.id = n.user_id
            WHERE n.due_date >= $1 AND n.due_date < $2
            ORDER BY n.due_date, n.id
            ",
        )
        .bind(from)
        .bind(until)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(DueNote::from).collect())
    }
}
