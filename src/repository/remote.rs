use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use validator::Validate;

use super::{decode_created, decode_list, HabitRepository, Repository};
use crate::api::{join_url, ApiClient};
use crate::dto::{CreateHabitRequest, LogHabitRequest, UpdateHabitRequest};
use crate::error::ClientResult;
use crate::models::diary::{DiaryEntry, DiaryPatch, DiaryQuery, NewDiaryEntry};
use crate::models::habit::Habit;
use crate::models::EntityId;

/// Habits on the backend: `GET /habits`, `POST /habit`, `PUT|DELETE /habit/{id}`
/// and `POST /habit/log`.
#[derive(Clone)]
pub struct RemoteHabitRepository {
    api: ApiClient,
}

impl RemoteHabitRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn item_path(&self, id: &EntityId) -> String {
        join_url(&self.api.config().endpoints.habit, &id.to_string())
    }
}

#[async_trait]
impl Repository for RemoteHabitRepository {
    type Item = Habit;
    type Draft = CreateHabitRequest;
    type Patch = UpdateHabitRequest;
    type Query = ();

    async fn fetch(&self, _query: &()) -> ClientResult<Vec<Habit>> {
        let body: Value = self.api.get(&self.api.config().endpoints.habits).await?;
        let habits = decode_list(body, &["habits", "data"])?;
        tracing::debug!(count = habits.len(), "Habits fetched");
        Ok(habits)
    }

    async fn create(&self, draft: &CreateHabitRequest) -> ClientResult<Option<Habit>> {
        draft.validate()?;
        let body: Value = self.api.post(&self.api.config().endpoints.habit, draft).await?;
        tracing::info!(title = %draft.title, "Habit created");
        Ok(decode_created(body, "habit"))
    }

    async fn update(&self, id: &EntityId, patch: &UpdateHabitRequest) -> ClientResult<()> {
        patch.validate()?;
        let _: Value = self.api.put(&self.item_path(id), patch).await?;
        tracing::info!(habit_id = %id, "Habit updated");
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> ClientResult<()> {
        self.api.delete(&self.item_path(id)).await?;
        tracing::info!(habit_id = %id, "Habit deleted");
        Ok(())
    }
}

#[async_trait]
impl HabitRepository for RemoteHabitRepository {
    async fn log(&self, request: &LogHabitRequest) -> ClientResult<()> {
        let _: Value = self
            .api
            .post(&self.api.config().endpoints.habit_log, request)
            .await?;
        tracing::info!(habit_id = %request.habit_id, completed = request.is_completed, "Habit logged");
        Ok(())
    }
}

/// Diary entries on a backend that exposes a diary resource at `base`.
#[derive(Clone)]
pub struct RemoteDiaryRepository {
    api: ApiClient,
    base: String,
}

impl RemoteDiaryRepository {
    pub fn new(api: ApiClient, base: impl Into<String>) -> Self {
        Self {
            api,
            base: base.into(),
        }
    }

    fn list_path(&self, date: Option<NaiveDate>) -> String {
        match date {
            Some(date) => format!("{}?date={}", self.base, date.format("%Y-%m-%d")),
            None => self.base.clone(),
        }
    }
}

#[async_trait]
impl Repository for RemoteDiaryRepository {
    type Item = DiaryEntry;
    type Draft = NewDiaryEntry;
    type Patch = DiaryPatch;
    type Query = DiaryQuery;

    async fn fetch(&self, query: &DiaryQuery) -> ClientResult<Vec<DiaryEntry>> {
        let body: Value = self.api.get(&self.list_path(query.date)).await?;
        let mut entries: Vec<DiaryEntry> = decode_list(body, &["entries", "diaries", "data"])?;

        // Some backends ignore the filter.
        if let Some(date) = query.date {
            entries.retain(|e| e.day().map_or(true, |d| d == date));
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn create(&self, draft: &NewDiaryEntry) -> ClientResult<Option<DiaryEntry>> {
        draft.validate()?;
        let body: Value = self.api.post(&self.base, draft).await?;
        Ok(decode_created(body, "entry"))
    }

    async fn update(&self, id: &EntityId, patch: &DiaryPatch) -> ClientResult<()> {
        let _: Value = self.api.put(&join_url(&self.base, &id.to_string()), patch).await?;
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> ClientResult<()> {
        self.api.delete(&join_url(&self.base, &id.to_string())).await
    }
}
