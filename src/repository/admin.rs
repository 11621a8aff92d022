use serde_json::Value;

use super::decode_list;
use crate::api::{join_url, ApiClient};
use crate::error::{ClientError, ClientResult};
use crate::models::audit::AuditLogEntry;
use crate::models::diary::DiaryEntry;
use crate::models::habit::Habit;
use crate::models::user::AdminUserRow;
use crate::models::EntityId;

/// Moderation endpoints. Admins can list and delete, never create or edit.
#[derive(Clone)]
pub struct AdminApi {
    api: ApiClient,
}

impl AdminApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All users. When the endpoint is not available the table shows just
    /// the signed-in admin.
    pub async fn users(&self) -> ClientResult<Vec<AdminUserRow>> {
        match self.list(&self.api.config().endpoints.users, &["users", "data"]).await {
            Ok(users) => Ok(users),
            Err(ClientError::Unauthorized(message)) => Err(ClientError::Unauthorized(message)),
            Err(e) => {
                tracing::warn!(error = %e, "Users endpoint unavailable, showing current user only");
                let current = self
                    .api
                    .session()
                    .user()
                    .ok_or_else(|| ClientError::Unauthorized("Not logged in".into()))?;
                Ok(vec![AdminUserRow::from(&current)])
            }
        }
    }

    /// All habits, falling back to the plain habits listing when the admin
    /// listing is not available.
    pub async fn habits(&self) -> ClientResult<Vec<Habit>> {
        let endpoints = &self.api.config().endpoints;
        match self.list(&endpoints.admin_habits, &["habits", "data"]).await {
            Ok(habits) => Ok(habits),
            Err(ClientError::Unauthorized(message)) => Err(ClientError::Unauthorized(message)),
            Err(e) => {
                tracing::warn!(error = %e, fallback = %endpoints.fallback_habits, "Admin habits endpoint unavailable");
                self.list(&endpoints.fallback_habits, &["habits", "data"]).await
            }
        }
    }

    pub async fn diaries(&self) -> ClientResult<Vec<DiaryEntry>> {
        self.list(&self.api.config().endpoints.admin_diaries, &["diaries", "entries", "data"])
            .await
    }

    pub async fn audit_logs(&self) -> ClientResult<Vec<AuditLogEntry>> {
        let raw: Vec<Value> = self
            .list(&self.api.config().endpoints.audit_logs, &["logs", "data"])
            .await?;
        Ok(raw.into_iter().map(AuditLogEntry::from_raw).collect())
    }

    pub async fn delete_habit(&self, id: &EntityId) -> ClientResult<()> {
        let path = join_url(&self.api.config().endpoints.admin_habits, &id.to_string());
        self.api.delete(&path).await?;
        tracing::info!(habit_id = %id, "Habit removed by admin");
        Ok(())
    }

    pub async fn delete_diary(&self, id: &EntityId) -> ClientResult<()> {
        let path = join_url(&self.api.config().endpoints.admin_diaries, &id.to_string());
        self.api.delete(&path).await?;
        tracing::info!(entry_id = %id, "Diary entry removed by admin");
        Ok(())
    }

    async fn list<T: serde::de::DeserializeOwned>(&self, path: &str, keys: &[&str]) -> ClientResult<Vec<T>> {
        let body: Value = self.api.get(path).await?;
        decode_list(body, keys)
    }
}
