#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use wiremock::MockServer;

use dreamyfocus_client::config::Config;
use dreamyfocus_client::routes::NavigationLog;
use dreamyfocus_client::storage::{MemoryStorage, Storage, TOKEN_KEY, USER_KEY};
use dreamyfocus_client::AppState;

pub const TOKEN: &str = "tok-1";

pub struct Harness {
    pub server: MockServer,
    pub state: AppState,
    pub storage: Arc<MemoryStorage>,
    pub navigation: Arc<NavigationLog>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Who {
    Nobody,
    User,
    Admin,
}

pub async fn harness(who: Who) -> Harness {
    harness_with(who, |_| {}).await
}

pub async fn harness_with(who: Who, tweak: impl FnOnce(&mut Config)) -> Harness {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());

    if who != Who::Nobody {
        let role = if who == Who::Admin { "admin" } else { "user" };
        let user = json!({"id": 7, "username": "kim", "role": role, "city_id": 2});
        storage.set(USER_KEY, &user.to_string()).unwrap();
        storage.set(TOKEN_KEY, TOKEN).unwrap();
    }

    let mut config = Config::for_base(server.uri());
    tweak(&mut config);

    let navigation = Arc::new(NavigationLog::new());
    let state = AppState::new(config, storage.clone(), navigation.clone()).unwrap();

    Harness {
        server,
        state,
        storage,
        navigation,
    }
}
