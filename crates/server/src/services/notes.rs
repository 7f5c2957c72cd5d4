//! Note service.
//!
//! Validates submitted note forms and applies owner-scoped CRUD through a
//! [`NoteStore`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

use duenotes_core::{NoteId, Priority, UserId};

use crate::db::{NoteQuery, NoteStore, RepositoryError};
use crate::models::{DEFAULT_CATEGORY, Note, NoteFields};

/// Note form values as submitted, kept verbatim for re-display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// `YYYY-MM-DD` from a date input, or empty.
    #[serde(default, rename = "dueDate")]
    pub due_date: String,
    #[serde(default)]
    pub priority: String,
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            description: note.description.clone(),
            category: note.category.clone(),
            due_date: note
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            priority: note.priority.unwrap_or_default().as_str().to_owned(),
        }
    }
}

/// Errors from note operations.
#[derive(Debug, Error)]
pub enum NoteError {
    /// A field failed validation; `draft` holds the values to show again.
    #[error("{message}")]
    Validation { message: String, draft: NoteDraft },

    /// No note with that id belongs to the acting user.
    #[error("note not found")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validate a draft into storable fields.
///
/// # Errors
///
/// Returns `NoteError::Validation` for a blank title, a malformed due date or
/// an unknown priority.
pub fn validate(draft: &NoteDraft) -> Result<NoteFields, NoteError> {
    let invalid = |message: &str| NoteError::Validation {
        message: message.to_owned(),
        draft: draft.clone(),
    };

    let title = draft.title.trim();
    if title.is_empty() {
        return Err(invalid("Title is required"));
    }

    let category = match draft.category.trim() {
        "" => DEFAULT_CATEGORY.to_owned(),
        c => c.to_owned(),
    };

    let due_date = match draft.due_date.trim() {
        "" => None,
        d => Some(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| invalid("Due date must be a valid date"))?,
        ),
    };

    let priority = match draft.priority.trim() {
        "" => Priority::default(),
        p => Priority::parse(p).map_err(|_| invalid("Priority must be High, Medium or Low"))?,
    };

    Ok(NoteFields {
        title: title.to_owned(),
        description: draft.description.trim().to_owned(),
        category,
        due_date,
        priority,
    })
}

/// Owner-scoped note operations.
pub struct NoteService<'a, S> {
    store: &'a S,
}

impl<'a, S: NoteStore> NoteService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Notes selected by `query`, in its order.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::Repository` if the store fails.
    pub async fn list(&self, query: &NoteQuery) -> Result<Vec<Note>, NoteError> {
        Ok(self.store.list_notes(query).await?)
    }

    /// Categories offered in the list filter.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::Repository` if the store fails.
    pub async fn categories(&self, owner: UserId) -> Result<Vec<String>, NoteError> {
        Ok(self.store.list_categories(owner).await?)
    }

    /// Create a note for `owner`. Nothing is stored when validation fails.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::Validation` for invalid input, or
    /// `NoteError::Repository` if the store fails.
    pub async fn create(
        &self,
        owner: UserId,
        draft: &NoteDraft,
        now: DateTime<Utc>,
    ) -> Result<Note, NoteError> {
        let fields = validate(draft)?;
        let note = self.store.create_note(owner, &fields, now).await?;
        tracing::info!(note_id = %note.id, owner_id = %owner, "Note created");
        Ok(note)
    }

    /// Load a note for editing.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::NotFound` if `owner` has no such note.
    pub async fn get(&self, owner: UserId, id: NoteId) -> Result<Note, NoteError> {
        self.store
            .get_note(owner, id)
            .await?
            .ok_or(NoteError::NotFound)
    }

    /// Apply an edit.
    ///
    /// On a validation failure the returned draft holds the stored note's
    /// values, so the edit form shows the note as it still is.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::NotFound` if `owner` has no such note,
    /// `NoteError::Validation` for invalid input, or `NoteError::Repository`.
    pub async fn update(
        &self,
        owner: UserId,
        id: NoteId,
        draft: &NoteDraft,
        now: DateTime<Utc>,
    ) -> Result<Note, NoteError> {
        let existing = self.get(owner, id).await?;

        let fields = validate(draft).map_err(|e| match e {
            NoteError::Validation { message, .. } => NoteError::Validation {
                message,
                draft: NoteDraft::from(&existing),
            },
            other => other,
        })?;

        let note = self
            .store
            .update_note(owner, id, &fields, now)
            .await?
            .ok_or(NoteError::NotFound)?;
        tracing::info!(note_id = %note.id, owner_id = %owner, "Note updated");
        Ok(note)
    }

    /// Delete a note.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::NotFound` if `owner` has no such note.
    pub async fn delete(&self, owner: UserId, id: NoteId) -> Result<(), NoteError> {
        if !self.store.delete_note(owner, id).await? {
            return Err(NoteError::NotFound);
        }
        tracing::info!(note_id = %id, owner_id = %owner, "Note deleted");
        Ok(())
    }
}
