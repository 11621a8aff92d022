use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use super::Repository;
use crate::error::{ClientError, ClientResult};
use crate::models::diary::{DiaryAuthor, DiaryEntry, DiaryPatch, DiaryQuery, NewDiaryEntry};
use crate::models::EntityId;
use crate::session::SessionStore;
use crate::storage::{self, Storage, DIARY_KEY};

/// `YYYY-MM-DD` → entries of that day, newest first.
type DiaryBook = BTreeMap<String, Vec<DiaryEntry>>;

/// Diary entries kept entirely on this device under `df_diary`.
#[derive(Clone)]
pub struct LocalDiaryRepository {
    storage: Arc<dyn Storage>,
    session: Arc<SessionStore>,
}

impl LocalDiaryRepository {
    pub fn new(storage: Arc<dyn Storage>, session: Arc<SessionStore>) -> Self {
        Self { storage, session }
    }

    fn load(&self) -> DiaryBook {
        let Some(raw) = storage::get_or_absent(self.storage.as_ref(), DIARY_KEY) else {
            return DiaryBook::new();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored diary is unreadable, starting empty");
            DiaryBook::new()
        })
    }

    fn save(&self, book: &DiaryBook) -> ClientResult<()> {
        let raw = serde_json::to_string(book)?;
        self.storage.set(DIARY_KEY, &raw)
    }

    fn author(&self) -> Option<DiaryAuthor> {
        self.session.user().map(|user| DiaryAuthor {
            id: Some(user.id),
            username: Some(user.username),
        })
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl Repository for LocalDiaryRepository {
    type Item = DiaryEntry;
    type Draft = NewDiaryEntry;
    type Patch = DiaryPatch;
    type Query = DiaryQuery;

    async fn fetch(&self, query: &DiaryQuery) -> ClientResult<Vec<DiaryEntry>> {
        let mut book = self.load();
        let entries = match query.date {
            Some(date) => book.remove(&day_key(date)).unwrap_or_default(),
            None => book.into_values().rev().flatten().collect(),
        };
        Ok(entries)
    }

    async fn create(&self, draft: &NewDiaryEntry) -> ClientResult<Option<DiaryEntry>> {
        draft.validate()?;

        let entry = DiaryEntry {
            id: EntityId::Text(Uuid::new_v4().to_string()),
            date: Some(draft.date),
            title: draft.title.trim().to_string(),
            body: draft.body.clone(),
            author: self.author(),
            author_name: None,
            user_id: None,
            created_at: Some(Utc::now().to_rfc3339()),
        };

        let mut book = self.load();
        book.entry(day_key(draft.date))
            .or_default()
            .insert(0, entry.clone());
        self.save(&book)?;

        tracing::debug!(id = %entry.id, date = %draft.date, "Diary entry stored locally");
        Ok(Some(entry))
    }

    async fn update(&self, id: &EntityId, patch: &DiaryPatch) -> ClientResult<()> {
        let mut book = self.load();
        let entry = book
            .values_mut()
            .flat_map(|entries| entries.iter_mut())
            .find(|e| &e.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("Diary entry {} not found", id)))?;

        patch.apply_checked(entry)?;
        self.save(&book)
    }

    async fn delete(&self, id: &EntityId) -> ClientResult<()> {
        let mut book = self.load();
        let mut removed = false;
        for entries in book.values_mut() {
            let before = entries.len();
            entries.retain(|e| &e.id != id);
            removed |= entries.len() != before;
        }

        if !removed {
            tracing::debug!(id = %id, "Diary entry already gone");
            return Ok(());
        }

        book.retain(|_, entries| !entries.is_empty());
        self.save(&book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, UnavailableStorage};

    fn repo() -> (LocalDiaryRepository, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let session = Arc::new(SessionStore::new(storage.clone()));
        (LocalDiaryRepository::new(storage.clone(), session), storage)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_entries_newest_first_per_day() {
        let (repo, storage) = repo();
        repo.create(&NewDiaryEntry::new(day(1), "first", "")).await.unwrap();
        repo.create(&NewDiaryEntry::new(day(1), "second", "")).await.unwrap();
        repo.create(&NewDiaryEntry::new(day(2), "other day", "")).await.unwrap();

        let titles: Vec<_> = repo
            .fetch(&DiaryQuery::on(day(1)))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);

        let raw = storage.get(DIARY_KEY).unwrap().unwrap();
        assert!(raw.contains("\"2026-03-01\""));
        assert!(raw.contains("\"text\""));

        assert_eq!(repo.fetch(&DiaryQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_entry_rejected() {
        let (repo, storage) = repo();
        let err = repo.create(&NewDiaryEntry::new(day(1), "  ", "")).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(storage.get(DIARY_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (repo, _) = repo();
        let created = repo
            .create(&NewDiaryEntry::new(day(5), "draft", "body"))
            .await
            .unwrap()
            .unwrap();

        let patch = DiaryPatch {
            title: Some(" final ".into()),
            body: None,
        };
        repo.update(&created.id, &patch).await.unwrap();
        let entries = repo.fetch(&DiaryQuery::on(day(5))).await.unwrap();
        assert_eq!(entries[0].title, "final");
        assert_eq!(entries[0].body, "body");

        let missing = repo.update(&EntityId::from("nope"), &patch).await;
        assert!(matches!(missing, Err(ClientError::NotFound(_))));

        repo.delete(&created.id).await.unwrap();
        assert!(repo.fetch(&DiaryQuery::on(day(5))).await.unwrap().is_empty());
        repo.delete(&created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_blanking_patch() {
        let (repo, _) = repo();
        let created = repo
            .create(&NewDiaryEntry::new(day(6), "T", "B"))
            .await
            .unwrap()
            .unwrap();

        let blank = DiaryPatch {
            title: Some("  ".into()),
            body: Some(String::new()),
        };
        let err = repo.update(&created.id, &blank).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let entries = repo.fetch(&DiaryQuery::on(day(6))).await.unwrap();
        assert_eq!((entries[0].title.as_str(), entries[0].body.as_str()), ("T", "B"));
    }

    #[tokio::test]
    async fn test_unavailable_storage_surfaces_on_write() {
        let storage: Arc<dyn Storage> = Arc::new(UnavailableStorage);
        let session = Arc::new(SessionStore::new(storage.clone()));
        let repo = LocalDiaryRepository::new(storage, session);

        assert!(repo.fetch(&DiaryQuery::on(day(1))).await.unwrap().is_empty());
        let err = repo.create(&NewDiaryEntry::new(day(1), "t", "")).await.unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
    }
}
