//! Per-screen controllers. Each view owns its `idle → loading → success |
//! error` state, turns every failure into that state and re-fetches after
//! a successful mutation.

pub mod admin;
pub mod auth;
pub mod diary;
pub mod focus;
pub mod habits;
pub mod profile;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Idle
    }
}

impl<T> ViewState<T> {
    pub fn from_result(result: ClientResult<T>) -> Self {
        match result {
            Ok(data) => ViewState::Success(data),
            Err(e) => ViewState::Error(e.user_message()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Asks the user before anything destructive is sent.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt = prompt, answer = self.0, "Auto-answered confirmation");
        self.0
    }
}

/// Result of a user action on a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The user said no at the confirmation prompt; nothing was sent.
    Declined,
    Failed(String),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub(crate) fn failed(action: &str, error: &ClientError) -> Self {
        tracing::warn!(action = action, error = %error, "View action failed");
        Outcome::Failed(error.user_message())
    }
}
