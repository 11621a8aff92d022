pub mod api;
pub mod auth;
pub mod avatar;
pub mod config;
pub mod dto;
pub mod error;
pub mod loader;
pub mod models;
pub mod repository;
pub mod routes;
pub mod session;
pub mod storage;
pub mod views;

use std::sync::Arc;

use api::ApiClient;
use auth::csrf::CsrfCache;
use avatar::ObjectUrls;
use config::Config;
use error::ClientResult;
use repository::{
    AdminApi, DiaryRepository, HabitRepository, LocalDiaryRepository, RemoteDiaryRepository,
    RemoteHabitRepository,
};
use routes::Navigator;
use session::SessionStore;
use storage::Storage;

/// Everything a view needs, wired once at startup and cloned freely.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    pub navigator: Arc<dyn Navigator>,
    pub object_urls: ObjectUrls,
}

impl AppState {
    /// Restore the persisted session and build the HTTP client around it.
    pub fn new(config: Config, storage: Arc<dyn Storage>, navigator: Arc<dyn Navigator>) -> ClientResult<Self> {
        let config = Arc::new(config);
        let session = Arc::new(SessionStore::restore(storage.clone()));
        let csrf = CsrfCache::new(storage.clone());
        let api = ApiClient::new(config.clone(), session.clone(), csrf, navigator.clone())?;

        Ok(Self {
            config,
            storage,
            session,
            api,
            navigator,
            object_urls: ObjectUrls::new(),
        })
    }

    pub fn habits(&self) -> Arc<dyn HabitRepository> {
        Arc::new(RemoteHabitRepository::new(self.api.clone()))
    }

    /// Diary entries go to the backend when a diary endpoint is configured
    /// and stay on this device otherwise.
    pub fn diary(&self) -> Arc<DiaryRepository> {
        match &self.config.endpoints.diary {
            Some(base) => Arc::new(RemoteDiaryRepository::new(self.api.clone(), base.clone())),
            None => Arc::new(LocalDiaryRepository::new(self.storage.clone(), self.session.clone())),
        }
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.api.clone())
    }
}
