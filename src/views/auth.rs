use serde_json::Value;
use validator::Validate;

use super::{Outcome, ViewState};
use crate::api::ApiClient;
use crate::config::LoginEncoding;
use crate::dto::{AuthPayload, LoginRequest, RegisterRequest};
use crate::error::{ClientError, ClientResult};
use crate::loader::{KeyedLoader, LoadOutcome};
use crate::models::user::{City, UserProfile};
use crate::repository::CityDirectory;
use crate::routes::Route;

/// Login and register forms, plus logout.
pub struct AuthView {
    api: ApiClient,
    cities: KeyedLoader<String, Vec<City>>,
    state: ViewState<UserProfile>,
}

impl AuthView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cities: KeyedLoader::new(),
            state: ViewState::Idle,
        }
    }

    pub fn state(&self) -> &ViewState<UserProfile> {
        &self.state
    }

    /// Cities for the register form's select.
    pub async fn load_cities(&self) -> LoadOutcome {
        let directory = CityDirectory::new(self.api.clone());
        let key = self.api.config().endpoints.cities.clone();
        self.cities.load(key, async move { directory.list().await }).await
    }

    pub fn cities(&self) -> ViewState<Vec<City>> {
        self.cities.state()
    }

    pub fn cancel_loads(&self) {
        self.cities.cancel();
    }

    /// Exchange credentials for a session, then prefetch a CSRF token.
    /// On success the caller should continue to [`Route::Home`].
    pub async fn login(&mut self, username: &str, password: &str) -> Outcome {
        let request = LoginRequest::new(username, password);
        if let Err(e) = request.validate() {
            return self.fail("login", ClientError::from(e));
        }

        self.state = ViewState::Loading;
        let endpoints = &self.api.config().endpoints;
        let answer: ClientResult<Value> = match self.api.config().login_encoding {
            LoginEncoding::Json => self.api.post(&endpoints.login, &request).await,
            LoginEncoding::Form => self.api.post_form(&endpoints.login, request.form_fields()).await,
        };

        let payload = match answer.and_then(|body| AuthPayload::from_response(&body, &request.username, None)) {
            Ok(payload) => payload,
            Err(e) => return self.fail("login", e),
        };

        self.api.session().login(payload.user.clone(), payload.token);
        tracing::info!(username = %payload.user.username, "Login succeeded");

        if self.api.config().csrf_enabled {
            if let Err(e) = self.api.refresh_csrf().await {
                tracing::warn!(error = %e, "CSRF init failed after login");
            }
        }

        self.state = ViewState::Success(payload.user);
        Outcome::Completed
    }

    /// Create an account and sign straight in. On success the caller
    /// should continue to [`Route::Profile`].
    pub async fn register(&mut self, request: RegisterRequest) -> Outcome {
        if let Err(e) = request.validate() {
            return self.fail("register", ClientError::from(e));
        }

        self.state = ViewState::Loading;
        let username = request.username.clone();
        let city_id = request.city_id;
        let form = match request.into_form() {
            Ok(form) => form,
            Err(e) => return self.fail("register", e),
        };

        let answer: ClientResult<Value> = self
            .api
            .post_multipart(&self.api.config().endpoints.register, form)
            .await;
        let payload = match answer.and_then(|body| AuthPayload::from_response(&body, &username, city_id)) {
            Ok(payload) => payload,
            Err(e) => return self.fail("register", e),
        };

        self.api.session().login(payload.user.clone(), payload.token);
        tracing::info!(username = %payload.user.username, "Registration succeeded");
        self.state = ViewState::Success(payload.user);
        Outcome::Completed
    }

    /// Drop the session and the CSRF token, then go to the login view.
    pub fn logout(&mut self) -> Route {
        self.api.session().logout();
        self.api.csrf().clear();
        self.state = ViewState::Idle;
        Route::Login
    }

    fn fail(&mut self, action: &str, error: ClientError) -> Outcome {
        // A rejected login is a wrong password, not an expired session.
        let message = match &error {
            ClientError::Unauthorized(message) if action == "login" && !message.is_empty() => message.clone(),
            ClientError::Unauthorized(_) if action == "login" => "Invalid username or password".to_string(),
            other => other.user_message(),
        };
        tracing::warn!(action = action, error = %error, "Authentication failed");
        self.state = ViewState::Error(message.clone());
        Outcome::Failed(message)
    }
}
