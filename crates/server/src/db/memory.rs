//! In-process store.
//!
//! Implements [`UserStore`] and [`NoteStore`] over a mutex-guarded map with
//! the same scoping and ordering rules as the `PostgreSQL` repositories. Used
//! by the test suites.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use duenotes_core::{Email, NoteId, UserId};

use super::{DueNote, NoteQuery, NoteStore, RepositoryError, UserStore};
use crate::models::{Note, NoteFields, PushSubscription, ResetCode, User};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    next_user_id: i32,
    next_note_id: i32,
    users: BTreeMap<UserId, StoredUser>,
    notes: BTreeMap<NoteId, Note>,
}

/// Shared in-memory user and note tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".to_owned()))
    }

    /// Stored password hash for `id`, if the user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the store lock is poisoned.
    pub fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).map(|u| u.password_hash.clone()))
    }

    /// Number of stored notes across all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the store lock is poisoned.
    pub fn note_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.notes.len())
    }
}

impl Tables {
    fn user_by_email(&self, email: &Email) -> Option<&StoredUser> {
        self.users.values().find(|u| u.user.email == *email)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut StoredUser, RepositoryError> {
        self.users.get_mut(&id).ok_or(RepositoryError::NotFound)
    }

    fn owned_note_mut(&mut self, owner: UserId, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(&id).filter(|n| n.owner_id == owner)
    }
}

impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.user_by_email(email).is_some() {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        tables.next_user_id += 1;
        let user = User {
            id: UserId::new(tables.next_user_id),
            email: email.clone(),
            reset: None,
            push_subscription: None,
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.user_by_email(email).map(|u| u.user.clone()))
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .lock()?
            .user_by_email(email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn set_reset_code(&self, id: UserId, reset: &ResetCode) -> Result<(), RepositoryError> {
        self.lock()?.user_mut(id)?.user.reset = Some(reset.clone());
        Ok(())
    }

    async fn record_failed_reset_attempt(
        &self,
        id: UserId,
        max_attempts: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut tables = self.lock()?;
        let user = &mut tables.user_mut(id)?.user;
        let Some(reset) = user.reset.as_mut() else {
            return Ok(None);
        };

        reset.failed_attempts += 1;
        let attempts = reset.failed_attempts;
        if attempts >= max_attempts {
            user.reset = None;
        }
        Ok(Some(attempts))
    }

    async fn complete_password_reset(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables.user_mut(id)?;
        stored.password_hash = password_hash.to_owned();
        stored.user.reset = None;
        Ok(())
    }

    async fn set_push_subscription(
        &self,
        id: UserId,
        subscription: Option<&PushSubscription>,
    ) -> Result<(), RepositoryError> {
        self.lock()?.user_mut(id)?.user.push_subscription = subscription.cloned();
        Ok(())
    }
}

impl NoteStore for MemoryStore {
    async fn list_notes(&self, query: &NoteQuery) -> Result<Vec<Note>, RepositoryError> {
        let tables = self.lock()?;
        let mut notes: Vec<Note> = tables
            .notes
            .values()
            .filter(|n| query.matches(n))
            .cloned()
            .collect();
        notes.sort_by(|a, b| query.compare(a, b));
        Ok(notes)
    }

    async fn list_categories(&self, owner: UserId) -> Result<Vec<String>, RepositoryError> {
        let tables = self.lock()?;
        let categories: BTreeSet<String> = tables
            .notes
            .values()
            .filter(|n| n.owner_id == owner)
            .map(|n| n.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn create_note(
        &self,
        owner: UserId,
        fields: &NoteFields,
        now: DateTime<Utc>,
    ) -> Result<Note, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&owner) {
            return Err(RepositoryError::Conflict("owner does not exist".to_owned()));
        }

        tables.next_note_id += 1;
        let note = Note {
            id: NoteId::new(tables.next_note_id),
            owner_id: owner,
            title: fields.title.clone(),
            description: fields.description.clone(),
            category: fields.category.clone(),
            due_date: fields.due_date,
            priority: Some(fields.priority),
            created_at: now,
            updated_at: None,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get_note(&self, owner: UserId, id: NoteId) -> Result<Option<Note>, RepositoryError> {
        Ok(self
            .lock()?
            .notes
            .get(&id)
            .filter(|n| n.owner_id == owner)
            .cloned())
    }

    async fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        fields: &NoteFields,
        now: DateTime<Utc>,
    ) -> Result<Option<Note>, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(note) = tables.owned_note_mut(owner, id) else {
            return Ok(None);
        };

        note.title.clone_from(&fields.title);
        note.description.clone_from(&fields.description);
        note.category.clone_from(&fields.category);
        note.due_date = fields.due_date;
        note.priority = Some(fields.priority);
        note.updated_at = Some(now);
        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, owner: UserId, id: NoteId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.owned_note_mut(owner, id).is_none() {
            return Ok(false);
        }
        Ok(tables.notes.remove(&id).is_some())
    }

    async fn notes_due_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DueNote>, RepositoryError> {
        let tables = self.lock()?;
        let mut due: Vec<DueNote> = tables
            .notes
            .values()
            .filter(|n| n.due_date.is_some_and(|d| d >= from && d < until))
            .map(|n| DueNote {
                note: n.clone(),
                subscription: tables
                    .users
                    .get(&n.owner_id)
                    .and_then(|u| u.user.push_subscription.clone()),
            })
            .collect();
        due.sort_by(|a, b| {
            a.note
                .due_date
                .cmp(&b.note.due_date)
                .then_with(|| a.note.id.cmp(&b.note.id))
        });
        Ok(due)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use duenotes_core::Priority;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).single().unwrap()
    }

    fn fields(title: &str) -> NoteFields {
        NoteFields {
            title: title.to_owned(),
            description: String::new(),
            category: "General".to_owned(),
            due_date: None,
            priority: Priority::Low,
        }
    }

    async fn user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(&Email::parse(email).unwrap(), "hash")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        user(&store, "a@example.com").await;
        let err = store
            .create_user(&Email::parse("A@example.com").unwrap(), "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_password_reset_clears_code() {
        let store = MemoryStore::new();
        let u = user(&store, "a@example.com").await;
        store
            .set_reset_code(u.id, &ResetCode::issue("123456".to_owned(), now()))
            .await
            .unwrap();
        store.complete_password_reset(u.id, "new-hash").await.unwrap();

        let reloaded = store.get_by_id(u.id).await.unwrap().unwrap();
        assert!(reloaded.reset.is_none());
        assert_eq!(store.password_hash(u.id).unwrap().as_deref(), Some("new-hash"));
    }

    #[tokio::test]
    async fn test_failed_attempts_revoke_code_at_limit() {
        let store = MemoryStore::new();
        let u = user(&store, "a@example.com").await;
        assert_eq!(store.record_failed_reset_attempt(u.id, 3).await.unwrap(), None);

        store
            .set_reset_code(u.id, &ResetCode::issue("123456".to_owned(), now()))
            .await
            .unwrap();
        assert_eq!(store.record_failed_reset_attempt(u.id, 3).await.unwrap(), Some(1));
        assert_eq!(store.record_failed_reset_attempt(u.id, 3).await.unwrap(), Some(2));
        let reloaded = store.get_by_id(u.id).await.unwrap().unwrap();
        assert_eq!(reloaded.reset.map(|r| r.failed_attempts), Some(2));

        assert_eq!(store.record_failed_reset_attempt(u.id, 3).await.unwrap(), Some(3));
        let reloaded = store.get_by_id(u.id).await.unwrap().unwrap();
        assert!(reloaded.reset.is_none());

        // A fresh code starts counting again.
        store
            .set_reset_code(u.id, &ResetCode::issue("654321".to_owned(), now()))
            .await
            .unwrap();
        assert_eq!(store.record_failed_reset_attempt(u.id, 3).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_note_operations_are_owner_scoped() {
        let store = MemoryStore::new();
        let a = user(&store, "a@example.com").await;
        let b = user(&store, "b@example.com").await;
        let note = store.create_note(a.id, &fields("Pay rent"), now()).await.unwrap();

        assert!(store.get_note(b.id, note.id).await.unwrap().is_none());
        assert!(store
            .update_note(b.id, note.id, &fields("Hijacked"), now())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_note(b.id, note.id).await.unwrap());

        let kept = store.get_note(a.id, note.id).await.unwrap().unwrap();
        assert_eq!(kept.title, "Pay rent");
        assert!(kept.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_notes_due_between_is_half_open() {
        let store = MemoryStore::new();
        let a = user(&store, "a@example.com").await;
        let today = now().date_naive();

        for (title, offset) in [("today", 0), ("tomorrow", 1), ("later", 2), ("yesterday", -1)] {
            let mut f = fields(title);
            f.due_date = Some(today + Duration::days(offset));
            store.create_note(a.id, &f, now()).await.unwrap();
        }
        store.create_note(a.id, &fields("undated"), now()).await.unwrap();

        let due = store
            .notes_due_between(today, today + Duration::days(2))
            .await
            .unwrap();
        let titles: Vec<_> = due.iter().map(|d| d.note.title.as_str()).collect();
        assert_eq!(titles, ["today", "tomorrow"]);
        assert!(due.iter().all(|d| d.subscription.is_none()));
    }
}
