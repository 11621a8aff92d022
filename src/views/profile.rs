use std::path::Path;

use serde_json::Value;
use validator::Validate;

use super::{Outcome, ViewState};
use crate::api::{resolve_asset_url, ApiClient};
use crate::avatar::{AvatarFile, AvatarPreview, ObjectUrls};
use crate::dto::ProfileUpdate;
use crate::error::ClientError;
use crate::loader::{KeyedLoader, LoadOutcome};
use crate::models::user::{City, UserProfile};
use crate::repository::CityDirectory;

/// Username, city and avatar editing for the signed-in user.
pub struct ProfileView {
    api: ApiClient,
    cities: KeyedLoader<String, Vec<City>>,
    object_urls: ObjectUrls,
    username: String,
    city_id: Option<i64>,
    picture: Option<AvatarFile>,
    preview: AvatarPreview,
    submit: ViewState<UserProfile>,
}

impl ProfileView {
    /// Form fields start from the user in the session.
    pub fn new(api: ApiClient, object_urls: ObjectUrls) -> Self {
        let user = api.session().user();
        Self {
            username: user.as_ref().map(|u| u.username.clone()).unwrap_or_default(),
            city_id: user.as_ref().and_then(|u| u.city_id),
            preview: AvatarPreview::from_stored(user.as_ref().and_then(|u| u.picture.as_deref())),
            api,
            cities: KeyedLoader::new(),
            object_urls,
            picture: None,
            submit: ViewState::Idle,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn city_id(&self) -> Option<i64> {
        self.city_id
    }

    pub fn set_username(&mut self, username: &str) {
        self.username = username.trim().to_string();
    }

    pub fn set_city(&mut self, city_id: Option<i64>) {
        self.city_id = city_id;
    }

    pub fn cities(&self) -> ViewState<Vec<City>> {
        self.cities.state()
    }

    pub fn submit_state(&self) -> &ViewState<UserProfile> {
        &self.submit
    }

    pub async fn load_cities(&self) -> LoadOutcome {
        let directory = CityDirectory::new(self.api.clone());
        let key = self.api.config().endpoints.cities.clone();
        self.cities.load(key, async move { directory.list().await }).await
    }

    /// Abandon a city load still in flight, as when the form is closed.
    pub fn cancel_loads(&self) {
        self.cities.cancel();
    }

    /// Pick a new avatar. The previous local preview is released as soon as
    /// it is replaced.
    pub async fn select_avatar(&mut self, path: &Path) -> Outcome {
        match AvatarFile::from_path(path).await {
            Ok(file) => {
                self.preview = AvatarPreview::Local(self.object_urls.create(&file));
                self.picture = Some(file);
                Outcome::Completed
            }
            Err(e) => Outcome::failed("select avatar", &e),
        }
    }

    pub fn clear_avatar(&mut self) {
        self.picture = None;
        let stored = self.api.session().user().and_then(|u| u.picture);
        self.preview = AvatarPreview::from_stored(stored.as_deref());
    }

    pub fn preview(&self) -> &AvatarPreview {
        &self.preview
    }

    /// Where the avatar slot should load its image from. `None` means the
    /// placeholder.
    pub fn preview_url(&self) -> Option<String> {
        match &self.preview {
            AvatarPreview::Placeholder => None,
            AvatarPreview::Remote(path) => resolve_asset_url(&self.api.config().api_base, path),
            AvatarPreview::Local(url) => Some(url.as_str().to_string()),
        }
    }

    /// Upload the form and merge the answer into the session.
    pub async fn submit(&mut self) -> Outcome {
        if !self.api.session().is_authenticated() {
            return Outcome::Failed("Please log in to view your profile".to_string());
        }

        let update = ProfileUpdate {
            username: self.username.clone(),
            city_id: self.city_id,
            picture: self.picture.clone(),
        };
        if let Err(e) = update.validate() {
            return self.fail(ClientError::from(e));
        }

        self.submit = ViewState::Loading;
        let form = match update.into_form() {
            Ok(form) => form,
            Err(e) => return self.fail(e),
        };

        let body: Value = match self
            .api
            .post_multipart(&self.api.config().endpoints.profile, form)
            .await
        {
            Ok(body) => body,
            Err(e) => return self.fail(e),
        };

        let updated = match body {
            Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
                map.remove("user").unwrap_or(Value::Null)
            }
            other => other,
        };

        match self.api.session().update_user_value(&updated) {
            Ok(user) => {
                tracing::info!(username = %user.username, "Profile updated");
                self.picture = None;
                self.preview = AvatarPreview::from_stored(user.picture.as_deref());
                self.username = user.username.clone();
                self.city_id = user.city_id.or(self.city_id);
                self.submit = ViewState::Success(user);
                Outcome::Completed
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: ClientError) -> Outcome {
        self.submit = ViewState::Error(error.user_message());
        Outcome::failed("update profile", &error)
    }
}
