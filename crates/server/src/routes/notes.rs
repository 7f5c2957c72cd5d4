//! Note list and editing route handlers.
//!
//! Every handler requires a logged-in user and scopes all reads and writes
//! to that user's notes. Another user's note id behaves as if it did not
//! exist.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};

use duenotes_core::{NoteId, Priority};

use crate::db::{ALL_CATEGORIES, ListParams, NoteQuery, NoteRepository, SortKey};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Note};
use crate::services::notes::{NoteDraft, NoteError, NoteService};
use crate::state::AppState;

/// Sort choices as `(value, label)`.
const SORT_CHOICES: [(SortKey, &str); 3] = [
    (SortKey::Newest, "Newest first"),
    (SortKey::Date, "Due date"),
    (SortKey::Priority, "Priority"),
];

/// One `<option>` of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: &str, label: &str, selected: bool) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
            selected,
        }
    }
}

/// Note id taken from the path.
///
/// An id that does not parse as a `NoteId` is answered like an unknown one.
pub struct NoteIdPath(pub NoteId);

impl<S> FromRequestParts<S> for NoteIdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<NoteId>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "Unparseable note id");
                Err(AppError::NotFound("note".to_owned()))
            }
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Notes list page template.
#[derive(Template, WebTemplate)]
#[template(path = "notes/list.html")]
pub struct NotesListTemplate {
    pub user: CurrentUser,
    pub notes: Vec<Note>,
    pub categories: Vec<String>,
    /// Search text as submitted, echoed back into the form.
    pub search: String,
    /// Selected category, `All` when unfiltered.
    pub category: String,
    pub sort: SortKey,
    /// The notes could not be loaded; an empty list is shown with a notice.
    pub load_error: bool,
    /// Whether the server can deliver push reminders.
    pub push_enabled: bool,
    pub today: NaiveDate,
}

impl NotesListTemplate {
    /// `All` followed by the user's categories.
    fn category_options(&self) -> Vec<SelectOption> {
        std::iter::once(ALL_CATEGORIES)
            .chain(self.categories.iter().map(String::as_str))
            .map(|c| SelectOption::new(c, c, c == self.category))
            .collect()
    }

    fn sort_options(&self) -> Vec<SelectOption> {
        SORT_CHOICES
            .iter()
            .map(|(key, label)| SelectOption::new(key.as_str(), label, *key == self.sort))
            .collect()
    }
}

/// Create and edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "notes/form.html")]
pub struct NoteFormTemplate {
    pub user: CurrentUser,
    /// Form target; `None` renders the create form.
    pub note_id: Option<NoteId>,
    pub draft: NoteDraft,
    pub error: Option<String>,
}

impl NoteFormTemplate {
    fn new(user: CurrentUser, note_id: Option<NoteId>, draft: NoteDraft) -> Self {
        Self {
            user,
            note_id,
            draft,
            error: None,
        }
    }

    fn action(&self) -> String {
        self.note_id
            .map_or_else(|| "/notes".to_owned(), |id| format!("/notes/edit/{id}"))
    }

    /// Priorities in rank order; an empty draft value selects the default.
    fn priority_options(&self) -> Vec<SelectOption> {
        let current = match self.draft.priority.as_str() {
            "" => Priority::default().as_str(),
            p => p,
        };
        Priority::ALL
            .iter()
            .map(|p| SelectOption::new(p.as_str(), p.as_str(), p.as_str() == current))
            .collect()
    }

    /// Render a validation failure with 422 so the form is shown again.
    fn invalid(mut self, message: String) -> Response {
        self.error = Some(message);
        (StatusCode::UNPROCESSABLE_ENTITY, self).into_response()
    }
}

// =============================================================================
// List
// =============================================================================

/// Display the current user's notes.
///
/// A store failure is logged and shown as a notice above an empty list.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let repo = NoteRepository::new(state.pool());
    let service = NoteService::new(&repo);
    let query = NoteQuery::from_params(user.id, &params);

    let (notes, load_error) = match service.list(&query).await {
        Ok(notes) => (notes, false),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to load notes");
            (Vec::new(), true)
        }
    };

    let categories = service.categories(user.id).await.unwrap_or_else(|e| {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to load categories");
        Vec::new()
    });

    NotesListTemplate {
        user,
        notes,
        categories,
        search: params.search.unwrap_or_default(),
        category: query.category().unwrap_or(ALL_CATEGORIES).to_owned(),
        sort: query.sort(),
        load_error,
        push_enabled: state.push_sender().is_some(),
        today: Utc::now().date_naive(),
    }
}

// =============================================================================
// Create
// =============================================================================

/// Display the empty create form.
pub async fn new_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    NoteFormTemplate::new(user, None, NoteDraft::default())
}

/// Create a note from the submitted form.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(draft): Form<NoteDraft>,
) -> Result<Response, AppError> {
    let repo = NoteRepository::new(state.pool());

    match NoteService::new(&repo)
        .create(user.id, &draft, Utc::now())
        .await
    {
        Ok(_) => Ok(Redirect::to("/notes").into_response()),
        Err(NoteError::Validation { message, draft }) => {
            Ok(NoteFormTemplate::new(user, None, draft).invalid(message))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Edit / Delete
// =============================================================================

/// Display the edit form for one of the user's notes.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    NoteIdPath(id): NoteIdPath,
) -> Result<Response, AppError> {
    let repo = NoteRepository::new(state.pool());
    let note = NoteService::new(&repo).get(user.id, id).await?;

    Ok(NoteFormTemplate::new(user, Some(id), NoteDraft::from(&note)).into_response())
}

/// Apply an edit from the submitted form.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    NoteIdPath(id): NoteIdPath,
    Form(draft): Form<NoteDraft>,
) -> Result<Response, AppError> {
    let repo = NoteRepository::new(state.pool());

    match NoteService::new(&repo)
        .update(user.id, id, &draft, Utc::now())
        .await
    {
        Ok(_) => Ok(Redirect::to("/notes").into_response()),
        Err(NoteError::Validation { message, draft }) => {
            Ok(NoteFormTemplate::new(user, Some(id), draft).invalid(message))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete one of the user's notes.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    NoteIdPath(id): NoteIdPath,
) -> Result<Redirect, AppError> {
    let repo = NoteRepository::new(state.pool());
    NoteService::new(&repo).delete(user.id, id).await?;
    Ok(Redirect::to("/notes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use askama::Template;
    use axum::{Router, body::Body, http::Request, routing::get};
    use chrono::DateTime;
    use duenotes_core::{Email, UserId};
    use tower::ServiceExt;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("ann@example.com").expect("valid email"),
        }
    }

    #[test]
    fn test_form_action() {
        let create = NoteFormTemplate::new(user(), None, NoteDraft::default());
        assert_eq!(create.action(), "/notes");

        let edit = NoteFormTemplate::new(user(), Some(NoteId::new(7)), NoteDraft::default());
        assert_eq!(edit.action(), "/notes/edit/7");
    }

    #[test]
    fn test_priority_options_default_to_low() {
        let form = NoteFormTemplate::new(user(), None, NoteDraft::default());
        let options = form.priority_options();

        let labels: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(labels, ["High", "Medium", "Low"]);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).map(|o| o.value.as_str()).collect();
        assert_eq!(selected, ["Low"]);
    }

    #[test]
    fn test_list_options_mark_current_selection() {
        let page = NotesListTemplate {
            user: user(),
            notes: Vec::new(),
            categories: vec!["Home".to_owned(), "Work".to_owned()],
            search: String::new(),
            category: "Work".to_owned(),
            sort: SortKey::Priority,
            load_error: false,
            push_enabled: false,
            today: NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date"),
        };

        let categories = page.category_options();
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[0].value, "All");
        assert!(categories[2].selected);
        assert!(!categories[0].selected);

        let sorts = page.sort_options();
        assert_eq!(sorts.iter().filter(|o| o.selected).count(), 1);
        assert!(sorts[2].selected);
    }

    #[test]
    fn test_list_renders_overdue_badge() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
        let note = |id: i32, title: &str, due_date: Option<NaiveDate>| Note {
            id: NoteId::new(id),
            owner_id: UserId::new(1),
            title: title.to_owned(),
            description: String::new(),
            category: "Home".to_owned(),
            due_date,
            priority: Some(Priority::Medium),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: None,
        };
        let page = NotesListTemplate {
            user: user(),
            notes: vec![
                note(1, "Late task", today.pred_opt()),
                note(2, "Today task", Some(today)),
            ],
            categories: vec!["Home".to_owned()],
            search: String::new(),
            category: ALL_CATEGORIES.to_owned(),
            sort: SortKey::Newest,
            load_error: false,
            push_enabled: false,
            today,
        };

        let html = page.render().expect("list renders");
        assert!(html.contains("Late task"));
        assert!(html.contains("Today task"));
        assert_eq!(html.matches("class=\"badge\">Overdue").count(), 1);
        assert!(html.contains("/notes/edit/2"));
    }

    #[tokio::test]
    async fn test_unparseable_note_id_is_not_found() {
        let app = Router::new().route(
            "/notes/edit/{id}",
            get(|NoteIdPath(id): NoteIdPath| async move { id.to_string() }),
        );

        for (uri, status) in [
            ("/notes/edit/7", StatusCode::OK),
            ("/notes/edit/abc", StatusCode::NOT_FOUND),
            ("/notes/edit/99999999999", StatusCode::NOT_FOUND),
        ] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), status, "{uri}");
        }
    }
}
