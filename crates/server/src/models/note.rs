//! Note domain types.

use chrono::{DateTime, NaiveDate, Utc};

use duenotes_core::{NoteId, Priority, UserId};

/// Category given to notes created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// A task note owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    /// `None` when the stored label is missing or not one of the known priorities.
    pub priority: Option<Priority>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated, user-editable note fields.
///
/// Produced by the note service from submitted form values; the title is
/// trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub title: String,
    pub description: String,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

impl Note {
    /// Priority label for display; stored labels that are not recognized show as "Unknown".
    #[must_use]
    pub fn priority_label(&self) -> &'static str {
        self.priority.map_or("Unknown", |p| p.as_str())
    }

    /// Whether the due date is before `today`.
    ///
    /// Templates pass their `today` field by reference.
    #[must_use]
    pub fn is_overdue(&self, today: &NaiveDate) -> bool {
        self.due_date.is_some_and(|d| d < *today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_due(due_date: Option<NaiveDate>) -> Note {
        Note {
            id: NoteId::new(1),
            owner_id: UserId::new(1),
            title: "Pay rent".to_owned(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_owned(),
            due_date,
            priority: Some(Priority::High),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: None,
        }
    }

    #[test]
    fn test_is_overdue_only_before_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default();

        assert!(note_due(today.pred_opt()).is_overdue(&today));
        assert!(!note_due(Some(today)).is_overdue(&today));
        assert!(!note_due(None).is_overdue(&today));
    }
}
