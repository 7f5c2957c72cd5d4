//! Integration tests for owner-scoped note management.

use chrono::{Duration, NaiveDate};

use duenotes_integration_tests::{fixed_now, signup};
use duenotes_server::db::{ListParams, MemoryStore, NoteQuery};
use duenotes_server::services::notes::{NoteDraft, NoteError, NoteService};

fn draft(title: &str, priority: &str, due: &str) -> NoteDraft {
    NoteDraft {
        title: title.to_owned(),
        priority: priority.to_owned(),
        due_date: due.to_owned(),
        ..NoteDraft::default()
    }
}

fn params(search: Option<&str>, category: Option<&str>, sort: Option<&str>) -> ListParams {
    ListParams {
        search: search.map(str::to_owned),
        category: category.map(str::to_owned),
        sort: sort.map(str::to_owned),
    }
}

fn titles(notes: &[duenotes_server::models::Note]) -> Vec<&str> {
    notes.iter().map(|n| n.title.as_str()).collect()
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_list_only_returns_own_notes() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let bob = signup(&store, "bob@example.com").await;
    let service = NoteService::new(&store);

    service
        .create(ann, &draft("Ann's task", "", ""), fixed_now())
        .await
        .expect("create");
    service
        .create(bob, &draft("Bob's task", "", ""), fixed_now())
        .await
        .expect("create");

    let anns = service.list(&NoteQuery::for_owner(ann)).await.expect("list");
    assert_eq!(titles(&anns), ["Ann's task"]);

    // Searching for the other user's title finds nothing.
    let query = NoteQuery::from_params(ann, &params(Some("Bob"), None, None));
    assert!(service.list(&query).await.expect("list").is_empty());
}

#[tokio::test]
async fn test_cross_user_edit_and_delete_are_not_found() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let bob = signup(&store, "bob@example.com").await;
    let service = NoteService::new(&store);

    let note = service
        .create(ann, &draft("Private", "High", ""), fixed_now())
        .await
        .expect("create");

    let edit = service
        .update(bob, note.id, &draft("Hijacked", "Low", ""), fixed_now())
        .await;
    assert!(matches!(edit, Err(NoteError::NotFound)));

    let delete = service.delete(bob, note.id).await;
    assert!(matches!(delete, Err(NoteError::NotFound)));

    assert!(matches!(service.get(bob, note.id).await, Err(NoteError::NotFound)));

    let unchanged = service.get(ann, note.id).await.expect("still there");
    assert_eq!(unchanged.title, "Private");
    assert_eq!(unchanged.updated_at, None);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_blank_title_is_not_persisted() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    let result = service
        .create(ann, &draft("   ", "High", "2024-05-02"), fixed_now())
        .await;

    match result {
        Err(NoteError::Validation { message, draft }) => {
            assert_eq!(message, "Title is required");
            assert_eq!(draft.priority, "High");
            assert_eq!(draft.due_date, "2024-05-02");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(store.note_count().expect("count"), 0);
}

#[tokio::test]
async fn test_invalid_edit_keeps_stored_note() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    let note = service
        .create(ann, &draft("Water plants", "Medium", ""), fixed_now())
        .await
        .expect("create");

    let result = service
        .update(ann, note.id, &draft("", "Low", ""), fixed_now())
        .await;
    match result {
        Err(NoteError::Validation { draft, .. }) => {
            assert_eq!(draft.title, "Water plants");
            assert_eq!(draft.priority, "Medium");
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let stored = service.get(ann, note.id).await.expect("get");
    assert_eq!(stored, note);
}

#[tokio::test]
async fn test_edit_updates_fields_and_timestamp() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    let note = service
        .create(ann, &draft("Draft report", "Low", ""), fixed_now())
        .await
        .expect("create");

    let later = fixed_now() + Duration::hours(1);
    let mut changes = draft("Final report", "High", "2024-05-03");
    changes.category = "Work".to_owned();
    let updated = service
        .update(ann, note.id, &changes, later)
        .await
        .expect("update");

    assert_eq!(updated.title, "Final report");
    assert_eq!(updated.category, "Work");
    assert_eq!(updated.due_date, NaiveDate::from_ymd_opt(2024, 5, 3));
    assert_eq!(updated.created_at, note.created_at);
    assert_eq!(updated.updated_at, Some(later));
}

// =============================================================================
// Search, filter and sort
// =============================================================================

#[tokio::test]
async fn test_priority_sort_orders_high_first() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    for (title, priority) in [("a", "Low"), ("b", "High"), ("c", "Medium")] {
        service
            .create(ann, &draft(title, priority, ""), fixed_now())
            .await
            .expect("create");
    }

    let query = NoteQuery::from_params(ann, &params(None, None, Some("priority")));
    let notes = service.list(&query).await.expect("list");
    assert_eq!(titles(&notes), ["b", "c", "a"]);
}

#[tokio::test]
async fn test_date_sort_puts_undated_notes_last() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    for (title, due) in [("later", "2024-06-01"), ("none", ""), ("soon", "2024-05-02")] {
        service
            .create(ann, &draft(title, "", due), fixed_now())
            .await
            .expect("create");
    }

    let query = NoteQuery::from_params(ann, &params(None, None, Some("date")));
    let notes = service.list(&query).await.expect("list");
    assert_eq!(titles(&notes), ["soon", "later", "none"]);
}

#[tokio::test]
async fn test_default_sort_is_newest_first() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    for (i, title) in ["first", "second", "third"].into_iter().enumerate() {
        let at = fixed_now() + Duration::minutes(i64::try_from(i).unwrap_or_default());
        service
            .create(ann, &draft(title, "", ""), at)
            .await
            .expect("create");
    }

    let notes = service.list(&NoteQuery::for_owner(ann)).await.expect("list");
    assert_eq!(titles(&notes), ["third", "second", "first"]);
}

#[tokio::test]
async fn test_search_and_category_filter() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;
    let service = NoteService::new(&store);

    let mut groceries = draft("Groceries", "", "");
    groceries.description = "Buy MILK and eggs".to_owned();
    groceries.category = "Home".to_owned();
    let mut standup = draft("Standup notes", "", "");
    standup.category = "Work".to_owned();
    let mut milk_run = draft("Milk run for office", "", "");
    milk_run.category = "Work".to_owned();

    for d in [&groceries, &standup, &milk_run] {
        service.create(ann, d, fixed_now()).await.expect("create");
    }

    // Case-insensitive over title and description.
    let query = NoteQuery::from_params(ann, &params(Some("milk"), None, None));
    let mut found = titles(&service.list(&query).await.expect("list"))
        .into_iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    found.sort();
    assert_eq!(found, ["Groceries", "Milk run for office"]);

    let query = NoteQuery::from_params(ann, &params(Some("milk"), Some("Work"), None));
    let notes = service.list(&query).await.expect("list");
    assert_eq!(titles(&notes), ["Milk run for office"]);

    // "All" disables the category filter.
    let query = NoteQuery::from_params(ann, &params(None, Some("All"), None));
    assert_eq!(service.list(&query).await.expect("list").len(), 3);

    let categories = service.categories(ann).await.expect("categories");
    assert_eq!(categories, ["Home", "Work"]);
}

#[tokio::test]
async fn test_note_defaults() {
    let store = MemoryStore::new();
    let ann = signup(&store, "ann@example.com").await;

    let note = NoteService::new(&store)
        .create(ann, &draft("Call mom", "", ""), fixed_now())
        .await
        .expect("create");

    assert_eq!(note.category, "General");
    assert_eq!(note.priority_label(), "Low");
    assert_eq!(note.due_date, None);
    assert_eq!(note.owner_id, ann);
}
