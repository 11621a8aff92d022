mod common;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{harness, harness_with, Who, TOKEN};
use dreamyfocus_client::config::Config;
use dreamyfocus_client::dto::{CreateHabitRequest, LogHabitRequest};
use dreamyfocus_client::error::ClientError;
use dreamyfocus_client::models::habit::Frequency;
use dreamyfocus_client::models::EntityId;
use dreamyfocus_client::repository::{HabitRepository, RemoteHabitRepository, Repository};
use dreamyfocus_client::routes::{NavigationLog, Route};
use dreamyfocus_client::storage::{MemoryStorage, Storage, CSRF_KEY, TOKEN_KEY, USER_KEY};
use dreamyfocus_client::AppState;

#[tokio::test]
async fn test_bearer_attached_and_no_csrf_on_get() {
    let h = harness(Who::User).await;

    Mock::given(method("GET"))
        .and(path("/habits"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Read", "frequency": "daily", "logs": null}
        ])))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(path("/api/csrf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrf_token": "c1"})))
        .expect(0)
        .mount(&h.server)
        .await;

    let habits = RemoteHabitRepository::new(h.state.api.clone())
        .fetch(&())
        .await
        .unwrap();
    assert_eq!(habits.len(), 1);
    assert!(habits[0].logs.is_empty());
}

#[tokio::test]
async fn test_csrf_fetched_once_and_reused() {
    let h = harness(Who::User).await;

    Mock::given(method("GET"))
        .and(path("/api/csrf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrf_token": "c1"})))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/habit"))
        .and(header("x-csrf-token", "c1"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5, "title": "Read"})))
        .expect(2)
        .mount(&h.server)
        .await;

    let repo = RemoteHabitRepository::new(h.state.api.clone());
    let draft = CreateHabitRequest::new("Read", "", Frequency::Daily);

    let created = repo.create(&draft).await.unwrap();
    assert_eq!(created.map(|habit| habit.id), Some(EntityId::Number(5)));
    repo.create(&draft).await.unwrap();

    assert_eq!(h.storage.get(CSRF_KEY).unwrap().as_deref(), Some("c1"));
}

#[tokio::test]
async fn test_csrf_failure_does_not_block_mutation() {
    let h = harness(Who::User).await;

    Mock::given(path("/api/csrf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/habit/log"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let repo = RemoteHabitRepository::new(h.state.api.clone());
    repo.log(&LogHabitRequest {
        habit_id: EntityId::Number(1),
        is_completed: true,
    })
    .await
    .unwrap();

    let requests = h.server.received_requests().await.unwrap();
    let log = requests
        .iter()
        .find(|r| r.url.path() == "/habit/log")
        .unwrap();
    assert!(log.headers.get("x-csrf-token").is_none());
    let body: Value = serde_json::from_slice(&log.body).unwrap();
    assert_eq!(body, json!({"habit_id": 1, "is_completed": true}));
}

#[tokio::test]
async fn test_csrf_disabled_skips_header() {
    let h = harness_with(Who::User, |config: &mut Config| config.csrf_enabled = false).await;

    Mock::given(path("/api/csrf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrf_token": "c1"})))
        .expect(0)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/habit/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    RemoteHabitRepository::new(h.state.api.clone())
        .delete(&EntityId::Number(3))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_401s_redirect_once() {
    let h = harness(Who::User).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token expired"})))
        .mount(&h.server)
        .await;

    let api = h.state.api.clone();
    let (first, second) = tokio::join!(api.get::<Value>("/habits"), api.get::<Value>("/api/cities"));

    for result in [first, second] {
        match result {
            Err(ClientError::Unauthorized(message)) => assert_eq!(message, "Token expired"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    assert_eq!(h.navigation.history(), vec![Route::Login]);
    assert!(!h.state.session.is_authenticated());
    assert!(h.state.session.user().is_none());
    assert!(h.storage.get(TOKEN_KEY).unwrap().is_none());
    assert!(h.storage.get(USER_KEY).unwrap().is_none());

    // A late 401 for a token that is already gone changes nothing.
    let _ = api.get::<Value>("/habits").await;
    assert_eq!(h.navigation.history(), vec![Route::Login]);
}

#[tokio::test]
async fn test_server_message_surfaces() {
    let h = harness(Who::User).await;

    Mock::given(method("GET"))
        .and(path("/habits"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"details": "Title already used"})))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    let err = h.state.api.get::<Value>("/habits").await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.user_message(), "Title already used");

    let err = h.state.api.get::<Value>("/api/logs").await.unwrap_err();
    assert_eq!(err.user_message(), "Service Unavailable");
    assert!(h.navigation.history().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let storage = std::sync::Arc::new(MemoryStorage::new());
    let navigation = std::sync::Arc::new(NavigationLog::new());
    let state = AppState::new(Config::for_base("http://127.0.0.1:9"), storage, navigation).unwrap();

    let err = state.api.get::<Value>("/habits").await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(err.user_message(), "Could not reach server");
}
