use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use validator::Validate;

use super::{Confirm, Outcome, ViewState};
use crate::error::ClientError;
use crate::models::diary::{DiaryEntry, DiaryPatch, DiaryQuery, NewDiaryEntry};
use crate::models::EntityId;
use crate::repository::DiaryRepository;
use crate::session::SessionStore;

pub const CALENDAR_CELLS: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub selected: bool,
}

/// Six Monday-first weeks covering the month of `any_day`.
pub fn month_grid(any_day: NaiveDate, selected: NaiveDate) -> Vec<CalendarDay> {
    let first = any_day.with_day(1).unwrap_or(any_day);
    let start = first - Duration::days(first.weekday().num_days_from_monday() as i64);

    (0..CALENDAR_CELLS as i64)
        .map(|offset| {
            let date = start + Duration::days(offset);
            CalendarDay {
                date,
                in_month: date.month() == first.month() && date.year() == first.year(),
                selected: date == selected,
            }
        })
        .collect()
}

pub struct DiaryView {
    repo: Arc<DiaryRepository>,
    session: Arc<SessionStore>,
    confirm: Arc<dyn Confirm>,
    date: NaiveDate,
    state: ViewState<Vec<DiaryEntry>>,
    open: Option<EntityId>,
}

impl DiaryView {
    pub fn new(
        repo: Arc<DiaryRepository>,
        session: Arc<SessionStore>,
        confirm: Arc<dyn Confirm>,
        today: NaiveDate,
    ) -> Self {
        Self {
            repo,
            session,
            confirm,
            date: today,
            state: ViewState::Idle,
            open: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn state(&self) -> &ViewState<Vec<DiaryEntry>> {
        &self.state
    }

    pub fn entries(&self) -> &[DiaryEntry] {
        self.state.data().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn calendar(&self) -> Vec<CalendarDay> {
        month_grid(self.date, self.date)
    }

    pub async fn select_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.open = None;
        self.load().await;
    }

    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        self.state = match self.repo.fetch(&DiaryQuery::on(self.date)).await {
            Ok(entries) => ViewState::Success(entries),
            Err(e) => {
                tracing::warn!(date = %self.date, error = %e, "Failed to load diary");
                ViewState::Error(e.user_message())
            }
        };

        if self.open.as_ref().is_some_and(|id| self.find(id).is_none()) {
            self.open = None;
        }
    }

    pub fn find(&self, id: &EntityId) -> Option<&DiaryEntry> {
        self.entries().iter().find(|e| &e.id == id)
    }

    pub fn open(&mut self, id: &EntityId) -> Option<&DiaryEntry> {
        if self.find(id).is_some() {
            self.open = Some(id.clone());
        }
        self.opened()
    }

    pub fn opened(&self) -> Option<&DiaryEntry> {
        self.open.as_ref().and_then(|id| self.find(id))
    }

    /// Entries without a recorded author were written on this device and
    /// count as the current user's.
    pub fn is_own(&self, entry: &DiaryEntry) -> bool {
        match (entry.author_id(), self.session.user()) {
            (None, _) => true,
            (Some(author), Some(user)) => author == &user.id,
            (Some(_), None) => false,
        }
    }

    pub async fn create(&mut self, title: &str, body: &str) -> Outcome {
        let draft = NewDiaryEntry::new(self.date, title, body);
        if let Err(e) = draft.validate() {
            return Outcome::failed("create diary entry", &ClientError::from(e));
        }

        match self.repo.create(&draft).await {
            Ok(created) => {
                self.load().await;
                if let Some(entry) = created {
                    self.open = Some(entry.id);
                }
                Outcome::Completed
            }
            Err(e) => Outcome::failed("create diary entry", &e),
        }
    }

    pub async fn update(&mut self, id: &EntityId, patch: DiaryPatch) -> Outcome {
        if let Err(e) = self.check_own(id) {
            return Outcome::failed("update diary entry", &e);
        }
        if let Some(mut preview) = self.find(id).cloned() {
            if let Err(e) = patch.apply_checked(&mut preview) {
                return Outcome::failed("update diary entry", &e);
            }
        }

        match self.repo.update(id, &patch).await {
            Ok(()) => {
                self.load().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("update diary entry", &e),
        }
    }

    pub async fn delete(&mut self, id: &EntityId) -> Outcome {
        let title = match self.check_own(id) {
            Ok(title) => title,
            Err(e) => return Outcome::failed("delete diary entry", &e),
        };
        if !self.confirm.confirm(&format!("Delete entry \"{}\"?", title)) {
            return Outcome::Declined;
        }

        match self.repo.delete(id).await {
            Ok(()) => {
                if self.open.as_ref() == Some(id) {
                    self.open = None;
                }
                self.load().await;
                Outcome::Completed
            }
            Err(e) => Outcome::failed("delete diary entry", &e),
        }
    }

    fn check_own(&self, id: &EntityId) -> Result<String, ClientError> {
        let entry = self
            .find(id)
            .ok_or_else(|| ClientError::NotFound(format!("Diary entry {} not found", id)))?;
        if !self.is_own(entry) {
            return Err(ClientError::Validation("You can only change your own entries".into()));
        }
        Ok(entry.display_title().to_string())
    }
}
