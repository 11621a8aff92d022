use std::sync::Arc;

use chrono::NaiveDate;
use validator::Validate;

use super::{Confirm, Outcome, ViewState};
use crate::dto::{CreateHabitRequest, LogHabitRequest, UpdateHabitRequest};
use crate::error::ClientError;
use crate::models::habit::{Frequency, Habit};
use crate::models::progress::HabitProgress;
use crate::models::EntityId;
use crate::repository::HabitRepository;
use crate::session::SessionStore;

/// The habit list with its detail pane.
pub struct HabitsView {
    repo: Arc<dyn HabitRepository>,
    session: Arc<SessionStore>,
    confirm: Arc<dyn Confirm>,
    state: ViewState<Vec<Habit>>,
    selected: Option<EntityId>,
}

impl HabitsView {
    pub fn new(repo: Arc<dyn HabitRepository>, session: Arc<SessionStore>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            repo,
            session,
            confirm,
            state: ViewState::Idle,
            selected: None,
        }
    }

    pub fn state(&self) -> &ViewState<Vec<Habit>> {
        &self.state
    }

    pub fn habits(&self) -> &[Habit] {
        self.state.data().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, id: &EntityId) -> Option<&Habit> {
        self.habits().iter().find(|h| &h.id == id)
    }

    pub fn selected(&self) -> Option<&Habit> {
        self.selected.as_ref().and_then(|id| self.find(id))
    }

    pub fn select(&mut self, id: &EntityId) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    /// Fetch the list. Without a signed-in user the list is empty and no
    /// request is made. The selection survives a reload when the habit is
    /// still there, otherwise it moves to the first habit.
    pub async fn load(&mut self) {
        if self.session.user().is_none() {
            self.state = ViewState::Success(Vec::new());
            self.selected = None;
            return;
        }

        self.state = ViewState::Loading;
        self.state = match self.repo.fetch(&()).await {
            Ok(habits) => ViewState::Success(habits),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load habits");
                ViewState::Error(e.user_message())
            }
        };

        let still_there = self.selected.as_ref().is_some_and(|id| self.find(id).is_some());
        if !still_there {
            self.selected = self.habits().first().map(|h| h.id.clone());
        }
    }

    pub async fn create(&mut self, title: &str, description: &str, frequency: Frequency) -> Outcome {
        let mut request = CreateHabitRequest::new(title, description, frequency);
        if let Some(user) = self.session.user() {
            request = request.owned_by(user.id);
        }
        if let Err(e) = request.validate() {
            return Outcome::failed("create habit", &ClientError::from(e));
        }

        match self.repo.create(&request).await {
            Ok(_) => {
                self.load().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("create habit", &e),
        }
    }

    /// Pause an active habit or resume a paused one. Overlapping toggles
    /// are not coordinated; whichever answer lands last wins.
    pub async fn toggle_active(&mut self, id: &EntityId) -> Outcome {
        let Some(current) = self.find(id).map(|h| h.is_active) else {
            return Outcome::failed("toggle habit", &not_found(id));
        };

        match self.repo.update(id, &UpdateHabitRequest::toggle(current)).await {
            Ok(()) => {
                self.load().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("toggle habit", &e),
        }
    }

    pub async fn log(&mut self, id: &EntityId, is_completed: bool) -> Outcome {
        let Some(habit) = self.find(id) else {
            return Outcome::failed("log habit", &not_found(id));
        };
        if !habit.is_active {
            return Outcome::Failed("Paused habits cannot be logged".to_string());
        }

        let request = LogHabitRequest {
            habit_id: id.clone(),
            is_completed,
        };
        match self.repo.log(&request).await {
            Ok(()) => {
                self.load().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("log habit", &e),
        }
    }

    pub async fn delete(&mut self, id: &EntityId) -> Outcome {
        let Some(title) = self.find(id).map(|h| h.title.clone()) else {
            return Outcome::failed("delete habit", &not_found(id));
        };
        if !self.confirm.confirm(&format!("Delete habit \"{}\"?", title)) {
            return Outcome::Declined;
        }

        match self.repo.delete(id).await {
            Ok(()) => {
                if self.selected.as_ref() == Some(id) {
                    self.selected = None;
                }
                self.load().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("delete habit", &e),
        }
    }

    pub fn progress(&self, id: &EntityId, today: NaiveDate) -> Option<HabitProgress> {
        self.find(id).map(|habit| HabitProgress::compute(habit, today))
    }
}

fn not_found(id: &EntityId) -> ClientError {
    ClientError::NotFound(format!("Habit {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::error::ClientResult;
    use crate::models::user::UserProfile;
    use crate::repository::Repository;
    use crate::storage::MemoryStorage;
    use crate::views::AutoConfirm;

    #[derive(Default)]
    struct FakeHabits {
        habits: Mutex<Vec<Habit>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Repository for FakeHabits {
        type Item = Habit;
        type Draft = CreateHabitRequest;
        type Patch = UpdateHabitRequest;
        type Query = ();

        async fn fetch(&self, _query: &()) -> ClientResult<Vec<Habit>> {
            self.calls.lock().push("fetch".into());
            Ok(self.habits.lock().clone())
        }

        async fn create(&self, draft: &CreateHabitRequest) -> ClientResult<Option<Habit>> {
            self.calls.lock().push(format!("create {}", draft.title));
            let habit: Habit = serde_json::from_value(json!({"id": 99, "title": draft.title})).unwrap();
            self.habits.lock().push(habit.clone());
            Ok(Some(habit))
        }

        async fn update(&self, id: &EntityId, patch: &UpdateHabitRequest) -> ClientResult<()> {
            self.calls.lock().push(format!("update {}", id));
            if let Some(h) = self.habits.lock().iter_mut().find(|h| &h.id == id) {
                if let Some(active) = patch.is_active {
                    h.is_active = active;
                }
            }
            Ok(())
        }

        async fn delete(&self, id: &EntityId) -> ClientResult<()> {
            self.calls.lock().push(format!("delete {}", id));
            self.habits.lock().retain(|h| &h.id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl HabitRepository for FakeHabits {
        async fn log(&self, request: &LogHabitRequest) -> ClientResult<()> {
            self.calls.lock().push(format!("log {}", request.habit_id));
            Ok(())
        }
    }

    fn habit(id: i64, title: &str, active: bool) -> Habit {
        serde_json::from_value(json!({"id": id, "title": title, "is_active": active})).unwrap()
    }

    fn view(logged_in: bool, confirm: bool) -> (HabitsView, Arc<FakeHabits>) {
        let repo = Arc::new(FakeHabits::default());
        repo.habits
            .lock()
            .extend([habit(1, "Read", true), habit(2, "Run", false)]);

        let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        if logged_in {
            let user: UserProfile = serde_json::from_value(json!({"id": 7, "username": "kim"})).unwrap();
            session.login(user, "tok".into());
        }

        let view = HabitsView::new(repo.clone(), session, Arc::new(AutoConfirm(confirm)));
        (view, repo)
    }

    #[tokio::test]
    async fn test_anonymous_load_makes_no_request() {
        let (mut view, repo) = view(false, true);
        view.load().await;
        assert!(view.habits().is_empty());
        assert!(repo.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_load_selects_first() {
        let (mut view, _) = view(true, true);
        view.load().await;
        assert_eq!(view.habits().len(), 2);
        assert_eq!(view.selected().map(|h| h.title.as_str()), Some("Read"));

        assert!(view.select(&EntityId::Number(2)));
        view.load().await;
        assert_eq!(view.selected().map(|h| h.title.as_str()), Some("Run"));
        assert!(!view.select(&EntityId::Number(42)));
    }

    #[tokio::test]
    async fn test_create_validates_then_refetches() {
        let (mut view, repo) = view(true, true);
        view.load().await;

        assert!(matches!(view.create("   ", "", Frequency::Daily).await, Outcome::Failed(_)));
        assert_eq!(view.create(" Stretch ", "", Frequency::Weekly).await, Outcome::Completed);

        let calls = repo.calls.lock().clone();
        assert_eq!(calls, vec!["fetch", "create Stretch", "fetch"]);
        assert_eq!(view.habits().len(), 3);
    }

    #[tokio::test]
    async fn test_paused_habit_cannot_be_logged() {
        let (mut view, repo) = view(true, true);
        view.load().await;

        assert!(matches!(view.log(&EntityId::Number(2), true).await, Outcome::Failed(_)));
        assert!(!repo.calls.lock().iter().any(|c| c.starts_with("log")));

        assert_eq!(view.toggle_active(&EntityId::Number(2)).await, Outcome::Completed);
        assert!(view.find(&EntityId::Number(2)).unwrap().is_active);
        assert_eq!(view.log(&EntityId::Number(2), true).await, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_declined_delete_sends_nothing() {
        let (mut view, repo) = view(true, false);
        view.load().await;

        assert_eq!(view.delete(&EntityId::Number(1)).await, Outcome::Declined);
        assert!(!repo.calls.lock().iter().any(|c| c.starts_with("delete")));
        assert_eq!(view.habits().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_clears_selection() {
        let (mut view, _) = view(true, true);
        view.load().await;
        assert!(view.select(&EntityId::Number(1)));

        assert_eq!(view.delete(&EntityId::Number(1)).await, Outcome::Completed);
        assert_eq!(view.selected().map(|h| h.title.as_str()), Some("Run"));
        assert!(view.find(&EntityId::Number(1)).is_none());
    }
}
