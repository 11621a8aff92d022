//! # DreamyFocus — Request DTOs and auth responses
//!
//! Everything this client sends to the backend, plus the tolerant reader
//! for what login and register answer with.
//!
//! Conventions:
//! - `*Request` → serialized into a JSON body, a form, or multipart parts
//! - All client-side validation is expressed via `validator` derive macros
//! - Optional fields are omitted from the body when unset

use reqwest::multipart::Form;
use serde::Serialize;
use serde_json::{json, Map, Value};
use validator::Validate;

use crate::avatar::AvatarFile;
use crate::error::{ClientError, ClientResult};
use crate::models::habit::Frequency;
use crate::models::user::UserProfile;
use crate::models::EntityId;

// ============================================================================
// Auth
// ============================================================================

/// POST /login
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Enter your username and password"))]
    pub username: String,

    #[validate(length(min = 1, message = "Enter your username and password"))]
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            password: password.to_string(),
        }
    }

    /// Body for `application/x-www-form-urlencoded` backends.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
        ]
    }
}

/// POST /register (multipart)
#[derive(Debug, Clone, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Enter a username"))]
    pub username: String,

    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,

    #[validate(required(message = "Select a city"))]
    pub city_id: Option<i64>,

    pub avatar: Option<AvatarFile>,
}

impl RegisterRequest {
    pub fn new(username: &str, password: &str, city_id: Option<i64>, avatar: Option<AvatarFile>) -> Self {
        Self {
            username: username.trim().to_string(),
            password: password.to_string(),
            city_id,
            avatar,
        }
    }

    pub fn into_form(self) -> ClientResult<Form> {
        let mut form = Form::new()
            .text("username", self.username)
            .text("password", self.password);
        if let Some(city_id) = self.city_id {
            form = form.text("city_id", city_id.to_string());
        }
        if let Some(avatar) = &self.avatar {
            form = form.part("avatar", avatar.to_part()?);
        }
        Ok(form)
    }
}

/// Token and user pulled out of a login or register answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserProfile,
}

impl AuthPayload {
    /// Backends disagree on where the credential lives. The token is read
    /// from `token`, `access_token`, `jwt` or `data.token`; the user from
    /// `user` or `data.user`, and otherwise assembled from top-level fields
    /// and what was typed into the form.
    pub fn from_response(body: &Value, username: &str, city_id: Option<i64>) -> ClientResult<Self> {
        let token = ["/token", "/access_token", "/jwt", "/data/token"]
            .iter()
            .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Decode("Token not found in response".into()))?
            .to_string();

        let mut user = ["/user", "/data/user"]
            .iter()
            .find_map(|pointer| body.pointer(pointer).and_then(Value::as_object))
            .cloned()
            .unwrap_or_else(|| synthesize_user(body, city_id));

        if !user.contains_key("id") {
            let id = body
                .get("id")
                .or_else(|| body.get("user_id"))
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| json!(username));
            user.insert("id".into(), id);
        }
        if !user.contains_key("username") {
            user.insert("username".into(), json!(username));
        }

        Ok(Self {
            token,
            user: UserProfile::from_patch(&user)?,
        })
    }
}

fn synthesize_user(body: &Value, city_id: Option<i64>) -> Map<String, Value> {
    let mut user = Map::new();
    for key in ["id", "username", "role"] {
        if let Some(value) = body.get(key).filter(|v| !v.is_null()) {
            user.insert(key.into(), value.clone());
        }
    }
    if let Some(picture) = body
        .get("picture")
        .or_else(|| body.get("avatar"))
        .filter(|v| !v.is_null())
    {
        user.insert("picture".into(), picture.clone());
    }
    if let Some(city_id) = city_id {
        user.insert("city_id".into(), json!(city_id));
    }
    user
}

// ============================================================================
// Profile
// ============================================================================

/// POST /update-profile (multipart)
#[derive(Debug, Clone, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,

    pub city_id: Option<i64>,

    pub picture: Option<AvatarFile>,
}

impl ProfileUpdate {
    pub fn into_form(self) -> ClientResult<Form> {
        let mut form = Form::new().text("username", self.username);
        if let Some(city_id) = self.city_id {
            form = form.text("city_id", city_id.to_string());
        }
        if let Some(picture) = &self.picture {
            form = form.part("picture", picture.to_part()?);
        }
        Ok(form)
    }
}

// ============================================================================
// Habits
// ============================================================================

/// POST /habit
#[derive(Debug, Clone, Serialize, Validate, PartialEq)]
pub struct CreateHabitRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(max = 500, message = "Description must be under 500 characters"))]
    pub description: String,

    pub frequency: Frequency,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
}

impl CreateHabitRequest {
    pub fn new(title: &str, description: &str, frequency: Frequency) -> Self {
        Self {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            frequency,
            user_id: None,
        }
    }

    pub fn owned_by(mut self, user_id: EntityId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// PUT /habit/{id} — partial update, all fields optional
#[derive(Debug, Clone, Default, Serialize, Validate, PartialEq)]
pub struct UpdateHabitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateHabitRequest {
    /// Flip a habit between active and paused.
    pub fn toggle(currently_active: bool) -> Self {
        Self {
            is_active: Some(!currently_active),
            ..Default::default()
        }
    }
}

/// POST /habit/log
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogHabitRequest {
    pub habit_id: EntityId,
    pub is_completed: bool,
}
