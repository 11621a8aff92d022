use std::sync::Arc;

use super::{Confirm, Outcome, ViewState};
use crate::models::audit::AuditLogEntry;
use crate::models::diary::DiaryEntry;
use crate::models::habit::Habit;
use crate::models::user::AdminUserRow;
use crate::models::EntityId;
use crate::repository::AdminApi;

/// The four moderation tabs. Each tab keeps its own state so one failing
/// listing does not blank the others.
pub struct AdminView {
    admin: AdminApi,
    confirm: Arc<dyn Confirm>,
    pub users: ViewState<Vec<AdminUserRow>>,
    pub habits: ViewState<Vec<Habit>>,
    pub diaries: ViewState<Vec<DiaryEntry>>,
    pub logs: ViewState<Vec<AuditLogEntry>>,
}

impl AdminView {
    pub fn new(admin: AdminApi, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            admin,
            confirm,
            users: ViewState::Idle,
            habits: ViewState::Idle,
            diaries: ViewState::Idle,
            logs: ViewState::Idle,
        }
    }

    /// Load every tab at once.
    pub async fn load_all(&mut self) {
        self.users = ViewState::Loading;
        self.habits = ViewState::Loading;
        self.diaries = ViewState::Loading;
        self.logs = ViewState::Loading;

        let (users, habits, diaries, logs) = futures_util::join!(
            self.admin.users(),
            self.admin.habits(),
            self.admin.diaries(),
            self.admin.audit_logs(),
        );

        self.users = ViewState::from_result(users);
        self.habits = ViewState::from_result(habits);
        self.diaries = ViewState::from_result(diaries);
        self.logs = ViewState::from_result(logs);
        tracing::debug!(
            users = self.users.data().map_or(0, Vec::len),
            habits = self.habits.data().map_or(0, Vec::len),
            diaries = self.diaries.data().map_or(0, Vec::len),
            logs = self.logs.data().map_or(0, Vec::len),
            "Admin panel loaded"
        );
    }

    pub async fn reload_habits(&mut self) {
        self.habits = ViewState::Loading;
        self.habits = ViewState::from_result(self.admin.habits().await);
    }

    pub async fn reload_diaries(&mut self) {
        self.diaries = ViewState::Loading;
        self.diaries = ViewState::from_result(self.admin.diaries().await);
    }

    pub async fn delete_habit(&mut self, id: &EntityId) -> Outcome {
        let title = self
            .habits
            .data()
            .and_then(|habits| habits.iter().find(|h| &h.id == id))
            .map(|h| h.title.clone())
            .unwrap_or_else(|| format!("#{}", id));
        if !self.confirm.confirm(&format!("Delete habit \"{}\"?", title)) {
            return Outcome::Declined;
        }

        match self.admin.delete_habit(id).await {
            Ok(()) => {
                self.reload_habits().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("admin delete habit", &e),
        }
    }

    pub async fn delete_diary(&mut self, id: &EntityId) -> Outcome {
        let title = self
            .diaries
            .data()
            .and_then(|entries| entries.iter().find(|e| &e.id == id))
            .map(|e| e.display_title().to_string())
            .unwrap_or_else(|| format!("#{}", id));
        if !self.confirm.confirm(&format!("Delete diary entry \"{}\"?", title)) {
            return Outcome::Declined;
        }

        match self.admin.delete_diary(id).await {
            Ok(()) => {
                self.reload_diaries().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("admin delete diary entry", &e),
        }
    }

    /// First error among the tabs, for a banner above them.
    pub fn first_error(&self) -> Option<String> {
        [
            self.users.error(),
            self.habits.error(),
            self.diaries.error(),
            self.logs.error(),
        ]
        .into_iter()
        .flatten()
        .next()
        .map(str::to_string)
    }
}
