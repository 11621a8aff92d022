//! Uniform data access for the views. Habits always live on the backend;
//! diary entries live on the backend when a diary endpoint is configured
//! and in local storage otherwise. Views only see the traits below.

mod admin;
mod cities;
mod local;
mod remote;

pub use admin::AdminApi;
pub use cities::CityDirectory;
pub use local::LocalDiaryRepository;
pub use remote::{RemoteDiaryRepository, RemoteHabitRepository};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dto::{CreateHabitRequest, LogHabitRequest, UpdateHabitRequest};
use crate::error::{ClientError, ClientResult};
use crate::models::diary::{DiaryEntry, DiaryPatch, DiaryQuery, NewDiaryEntry};
use crate::models::habit::Habit;
use crate::models::EntityId;

#[async_trait]
pub trait Repository: Send + Sync {
    type Item: Send;
    type Draft: Send + Sync;
    type Patch: Send + Sync;
    type Query: Send + Sync;

    async fn fetch(&self, query: &Self::Query) -> ClientResult<Vec<Self::Item>>;

    /// Store a new item. Backends that answer with an empty body yield `None`.
    async fn create(&self, draft: &Self::Draft) -> ClientResult<Option<Self::Item>>;

    async fn update(&self, id: &EntityId, patch: &Self::Patch) -> ClientResult<()>;

    async fn delete(&self, id: &EntityId) -> ClientResult<()>;
}

#[async_trait]
pub trait HabitRepository:
    Repository<Item = Habit, Draft = CreateHabitRequest, Patch = UpdateHabitRequest, Query = ()>
{
    async fn log(&self, request: &LogHabitRequest) -> ClientResult<()>;
}

pub type DiaryRepository =
    dyn Repository<Item = DiaryEntry, Draft = NewDiaryEntry, Patch = DiaryPatch, Query = DiaryQuery>;

/// Read a list answer. Backends return either a bare array or an object
/// holding the array under one of `keys`; anything else is an empty list.
pub(crate) fn decode_list<T: DeserializeOwned>(value: Value, keys: &[&str]) -> ClientResult<Vec<T>> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match keys.iter().find_map(|key| map.remove(*key)) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    list.into_iter()
        .map(|item| serde_json::from_value(item).map_err(ClientError::from))
        .collect()
}

/// Pull the created record out of a create answer, bare or wrapped under `key`.
pub(crate) fn decode_created<T: DeserializeOwned>(value: Value, key: &str) -> Option<T> {
    let record = match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key)?,
        Value::Null => return None,
        other => other,
    };

    serde_json::from_value(record)
        .map_err(|e| tracing::debug!(error = %e, "Create answer did not contain a full record"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_list_shapes() {
        let bare: Vec<i32> = decode_list(json!([1, 2]), &["items"]).unwrap();
        assert_eq!(bare, vec![1, 2]);

        let wrapped: Vec<i32> = decode_list(json!({"items": [3]}), &["data", "items"]).unwrap();
        assert_eq!(wrapped, vec![3]);

        let odd: Vec<i32> = decode_list(json!({"message": "ok"}), &["items"]).unwrap();
        assert!(odd.is_empty());
        let null: Vec<i32> = decode_list(Value::Null, &["items"]).unwrap();
        assert!(null.is_empty());

        assert!(decode_list::<i32>(json!(["x"]), &[]).is_err());
    }

    #[test]
    fn test_decode_created() {
        let habit: Option<Habit> = decode_created(json!({"habit": {"id": 4, "title": "Run"}}), "habit");
        assert_eq!(habit.map(|h| h.id), Some(EntityId::Number(4)));

        let bare: Option<Habit> = decode_created(json!({"id": 5, "title": "Read"}), "habit");
        assert_eq!(bare.map(|h| h.title), Some("Read".to_string()));

        assert!(decode_created::<Habit>(json!({"message": "created"}), "habit").is_none());
        assert!(decode_created::<Habit>(Value::Null, "habit").is_none());
    }
}
