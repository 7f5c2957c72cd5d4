//! Note list query construction.
//!
//! A [`NoteQuery`] is built once from the list page's query parameters and can
//! then be applied two ways: appended to a `PostgreSQL` statement with
//! [`NoteQuery::push_sql`], or evaluated against notes held in memory with
//! [`NoteQuery::matches`] and [`NoteQuery::compare`]. Both produce the same
//! selection and order.
//!
//! Ordering:
//!
//! - `date`: due date ascending, notes without a due date last, then newest first
//! - `priority`: High, Medium, Low, then anything else, then newest first
//! - anything else: newest first
//!
//! Ties that remain after creation time are broken by descending note id.

use std::cmp::Ordering;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use duenotes_core::{Priority, UNRANKED, UserId};

use crate::models::Note;

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "All";

/// Raw list parameters as they arrive on `GET /notes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

/// Ordering requested for the notes list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Date,
    Priority,
}

impl SortKey {
    /// Parse a `sort` parameter. Unknown or missing values mean newest first.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("date") => Self::Date,
            Some("priority") => Self::Priority,
            _ => Self::Newest,
        }
    }

    /// Parameter value, as echoed back into the list form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Date => "date",
            Self::Priority => "priority",
        }
    }
}

/// Owner-scoped filter and ordering for one notes list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    owner: UserId,
    search: Option<String>,
    category: Option<String>,
    sort: SortKey,
}

impl NoteQuery {
    /// All of `owner`'s notes, newest first.
    #[must_use]
    pub const fn for_owner(owner: UserId) -> Self {
        Self {
            owner,
            search: None,
            category: None,
            sort: SortKey::Newest,
        }
    }

    /// Build a query from request parameters.
    ///
    /// Blank search text is ignored. A missing, blank or `All` category does
    /// not filter.
    #[must_use]
    pub fn from_params(owner: UserId, params: &ListParams) -> Self {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned);

        let category = params
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
            .map(ToOwned::to_owned);

        Self {
            owner,
            search,
            category,
            sort: SortKey::parse(params.sort.as_deref()),
        }
    }

    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub const fn sort(&self) -> SortKey {
        self.sort
    }

    /// Whether `note` is selected by this query.
    #[must_use]
    pub fn matches(&self, note: &Note) -> bool {
        if note.owner_id != self.owner {
            return false;
        }

        if let Some(category) = &self.category
            && note.category != *category
        {
            return false;
        }

        match &self.search {
            Some(search) => {
                let needle = search.to_lowercase();
                note.title.to_lowercase().contains(&needle)
                    || note.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }

    /// Order two selected notes.
    #[must_use]
    pub fn compare(&self, a: &Note, b: &Note) -> Ordering {
        let primary = match self.sort {
            SortKey::Newest => Ordering::Equal,
            SortKey::Date => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => Priority::rank_of(a.priority).cmp(&Priority::rank_of(b.priority)),
        };

        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }

    /// Append `WHERE ... ORDER BY ...` for a statement selecting from `notes`.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE user_id = ");
        qb.push_bind(self.owner);

        if let Some(category) = &self.category {
            qb.push(" AND category = ");
            qb.push_bind(category.clone());
        }

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(r" ESCAPE '\' OR description ILIKE ");
            qb.push_bind(pattern);
            qb.push(r" ESCAPE '\')");
        }

        qb.push(" ORDER BY ");
        match self.sort {
            SortKey::Newest => {}
            SortKey::Date => {
                qb.push("due_date ASC NULLS LAST, ");
            }
            SortKey::Priority => {
                qb.push(priority_rank_sql());
                qb.push(" ASC, ");
            }
        }
        qb.push("created_at DESC, id DESC");
    }
}

/// `CASE` expression ranking the stored priority label.
fn priority_rank_sql() -> String {
    let mut sql = String::from("CASE priority");
    for priority in Priority::ALL {
        sql.push_str(&format!(" WHEN '{}' THEN {}", priority.as_str(), priority.rank()));
    }
    sql.push_str(&format!(" ELSE {UNRANKED} END"));
    sql
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
