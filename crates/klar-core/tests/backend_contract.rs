//! Backend contract tests.
//!
//! Runs the REST client, the task store and the auth/settings fallbacks
//! against a mock server and checks the requests they send and how they
//! react to failures.

use std::sync::Arc;
use std::time::Duration;

use klar_core::api::SessionUpdate;
use klar_core::storage::keys;
use klar_core::{
    auth, settings, stats, ApiClient, ApiError, AuthState, Config, CoreError, KeyValueStore,
    MemoryStore, Phase, TaskStore, Theme,
};
use mockito::{Matcher, Server};
use serde_json::json;

const TOKEN: &str = "test-token";

fn client_for(server: &Server) -> ApiClient {
    ApiClient::new(&format!("{}/api", server.url()), TOKEN, Duration::from_secs(5)).unwrap()
}

fn config_for(server: &Server) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api", server.url());
    config.api.timeout_secs = 5;
    config
}

fn unreachable_client() -> ApiClient {
    // Port 9 (discard) is closed on test machines.
    ApiClient::new("http://127.0.0.1:9/api", TOKEN, Duration::from_secs(2)).unwrap()
}

// ── Tasks ────────────────────────────────────────────────────────────

#[tokio::test]
async fn task_list_unwraps_envelope_and_accepts_id_variants() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/tasks")
        .match_header("authorization", format!("Bearer {TOKEN}").as_str())
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "data": [
                    { "id": 7, "title": "Numeric id", "completed": true },
                    { "_id": "abc", "text": "Legacy shape" },
                    { "title": "No id at all" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tasks = client_for(&server).list_tasks().await.unwrap();

    mock.assert_async().await;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, "7");
    assert!(tasks[0].completed);
    assert_eq!(tasks[1].id, "abc");
    assert_eq!(tasks[1].title, "Legacy shape");
    assert!(!tasks[1].completed);
}

#[tokio::test]
async fn task_list_that_is_not_an_array_is_empty() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_body(r#"{"data":{"unexpected":true}}"#)
        .create_async()
        .await;

    let tasks = client_for(&server).list_tasks().await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn remote_store_adds_only_after_server_confirms() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_body(r#"[{"id":"1","title":"Existing","completed":false}]"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/api/tasks")
        .match_body(Matcher::PartialJson(json!({ "title": "Write docs", "completed": false })))
        .with_status(201)
        .with_body(r#"{"data":{"id":"2","title":"Write docs","completed":false}}"#)
        .create_async()
        .await;

    let mut store = TaskStore::new(Arc::new(MemoryStore::new()));
    store.switch_mode(Some(client_for(&server))).await;
    assert!(store.is_remote());
    assert_eq!(store.total_count(), 1);

    assert!(store.add("  Write docs  ").await.unwrap());

    create.assert_async().await;
    assert_eq!(store.total_count(), 2);
    assert_eq!(store.tasks()[1].id, "2");
}

#[tokio::test]
async fn records_carrying_both_spellings_are_accepted() {
    let mut server = Server::new_async().await;
    let record = json!({ "id": "n1", "title": "New", "text": "New", "completed": false });
    server
        .mock("GET", "/api/tasks")
        .with_body(json!([record]).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/api/tasks")
        .with_status(201)
        .with_body(
            json!({ "id": "n2", "title": "Next", "text": "Next", "completed": false }).to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/settings")
        .with_body(
            json!({
                "workDuration": 1200,
                "work_duration": 1200,
                "shortBreakDuration": 240,
                "short_break_duration": 240,
                "theme": "dark"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let remote = client.settings().await.unwrap();
    assert_eq!(remote.work_duration_secs, 1200);
    assert_eq!(remote.short_break_duration_secs, 240);

    let mut store = TaskStore::new(Arc::new(MemoryStore::new()));
    store.switch_mode(Some(client)).await;
    assert_eq!(store.total_count(), 1);
    assert!(store.add("Next").await.unwrap());
    assert_eq!(store.total_count(), 2);
    assert_eq!(store.tasks()[1].id, "n2");
}

#[tokio::test]
async fn created_task_without_title_keeps_the_submitted_one() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/api/tasks").with_body("[]").create_async().await;
    server
        .mock("POST", "/api/tasks")
        .with_status(201)
        .with_body(r#"{"data":{"id":"9","completed":false}}"#)
        .create_async()
        .await;

    let mut store = TaskStore::new(Arc::new(MemoryStore::new()));
    store.switch_mode(Some(client_for(&server))).await;
    assert!(store.add("Plan sprint").await.unwrap());
    assert_eq!(store.tasks()[0].id, "9");
    assert_eq!(store.tasks()[0].title, "Plan sprint");
}

#[tokio::test]
async fn remote_create_failure_leaves_collection_unchanged() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_body(r#"[{"id":"1","title":"Existing","completed":false}]"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/tasks")
        .with_status(500)
        .with_body(r#"{"error":"database down"}"#)
        .create_async()
        .await;

    let local = Arc::new(MemoryStore::new());
    let mut store = TaskStore::new(local.clone());
    store.switch_mode(Some(client_for(&server))).await;

    let err = store.add("Write docs").await.unwrap_err();
    match err {
        CoreError::Api(ApiError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.total_count(), 1);
    // Remote mode never writes the local snapshot.
    assert_eq!(local.get(keys::TASKS).unwrap(), None);
}

#[tokio::test]
async fn remote_create_network_failure_leaves_collection_unchanged() {
    let mut store = TaskStore::new(Arc::new(MemoryStore::new()));
    store.switch_mode(Some(unreachable_client())).await;
    // The list failed too, so the collection starts empty.
    assert_eq!(store.total_count(), 0);

    let err = store.add("Write docs").await.unwrap_err();
    assert!(matches!(err, CoreError::Api(ApiError::Network(_))), "{err:?}");
    assert_eq!(store.total_count(), 0);
}

#[tokio::test]
async fn remote_toggle_and_remove_hit_the_task_endpoints() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_body(
            r#"[{"id":"t-1","title":"First","completed":false},{"id":"2","title":"Other","completed":false}]"#,
        )
        .create_async()
        .await;
    // The toggle response omits the id; the requested id is kept.
    let toggle = server
        .mock("PATCH", "/api/tasks/t-1/toggle")
        .with_body(r#"{"data":{"title":"First","completed":true}}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/api/tasks/2")
        .with_status(204)
        .create_async()
        .await;
    let untouched = server
        .mock("DELETE", "/api/tasks/missing")
        .expect(0)
        .create_async()
        .await;

    let mut store = TaskStore::new(Arc::new(MemoryStore::new()));
    store.switch_mode(Some(client_for(&server))).await;

    assert!(store.toggle("t-1").await.unwrap());
    assert!(store.remove("2").await.unwrap());
    assert!(!store.remove("missing").await.unwrap());

    toggle.assert_async().await;
    delete.assert_async().await;
    untouched.assert_async().await;
    assert_eq!(store.total_count(), 1);
    assert_eq!(store.tasks()[0].id, "t-1");
    assert!(store.tasks()[0].completed);
    assert_eq!(store.completion_percentage(), 100);
}

// ── Sessions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn session_calls_send_expected_bodies() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/api/sessions")
        .match_body(Matcher::Json(json!({ "duration": 25, "type": "work", "taskId": null })))
        .with_status(201)
        .with_body(r#"{"data":{"session_id":42}}"#)
        .create_async()
        .await;
    let update = server
        .mock("PUT", "/api/sessions/42")
        .match_body(Matcher::Json(json!({ "actualDuration": 90, "completed": false })))
        .with_body("{}")
        .create_async()
        .await;
    let complete = server
        .mock("POST", "/api/sessions/42/complete")
        .with_body("")
        .create_async()
        .await;

    let client = client_for(&server);
    let id = client.create_session(25, Phase::Work, None).await.unwrap();
    assert_eq!(id, "42");
    client
        .update_session(
            &id,
            &SessionUpdate {
                actual_duration_secs: 90,
                completed: Some(false),
            },
        )
        .await
        .unwrap();
    client.complete_session(&id).await.unwrap();

    create.assert_async().await;
    update.assert_async().await;
    complete.assert_async().await;
}

#[tokio::test]
async fn session_without_id_is_an_invalid_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/sessions")
        .with_body(r#"{"data":{"ok":true}}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .create_session(5, Phase::Break, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

// ── Auth ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_reads_nested_user_and_stores_token() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .match_header("authorization", "Bearer good")
        .with_body(r#"{"user":{"id":"u1","email":"dev@example.com","login":"dev","picture":"https://img"}}"#)
        .create_async()
        .await;

    let store = MemoryStore::new();
    let state = auth::login(&config_for(&server), &store, "good").await.unwrap();

    let user = state.user().unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.name, "dev");
    assert_eq!(user.avatar_url.as_deref(), Some("https://img"));
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("good"));
}

#[tokio::test]
async fn restore_with_rejected_token_clears_it() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .with_status(401)
        .with_body(r#"{"error":"expired"}"#)
        .create_async()
        .await;

    let store = MemoryStore::new();
    store.set(keys::AUTH_TOKEN, "stale").unwrap();

    let state = auth::restore(&config_for(&server), &store).await;

    assert!(matches!(state, AuthState::Anonymous));
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
}

#[tokio::test]
async fn restore_while_offline_keeps_the_token() {
    let mut config = Config::default();
    config.api.base_url = "http://127.0.0.1:9/api".into();
    config.api.timeout_secs = 2;
    let store = MemoryStore::new();
    store.set(keys::AUTH_TOKEN, "still-good").unwrap();

    let state = auth::restore(&config, &store).await;

    assert!(matches!(state, AuthState::Anonymous));
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("still-good"));
}

#[tokio::test]
async fn rejected_login_maps_to_unauthorized() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .with_status(403)
        .create_async()
        .await;

    let store = MemoryStore::new();
    let err = auth::login(&config_for(&server), &store, "bad").await.unwrap_err();
    assert!(matches!(err, CoreError::Api(ApiError::Unauthorized)));
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
}

#[tokio::test]
async fn logout_clears_token_even_when_backend_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .with_body(r#"{"id":"u1","email":"dev@example.com","name":"Dev"}"#)
        .create_async()
        .await;
    let logout = server
        .mock("POST", "/api/auth/logout")
        .with_status(500)
        .create_async()
        .await;

    let store = MemoryStore::new();
    let state = auth::login(&config_for(&server), &store, "good").await.unwrap();
    auth::logout(&state, &store).await;

    logout.assert_async().await;
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
}

// ── Settings and stats ───────────────────────────────────────────────

#[tokio::test]
async fn remote_settings_win_and_persist_theme() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/settings")
        .with_body(r#"{"data":{"workDuration":3000,"shortBreakDuration":600,"theme":"dark"}}"#)
        .create_async()
        .await;

    let store = MemoryStore::new();
    let client = client_for(&server);
    let loaded = settings::load(Some(&client), &Config::default(), &store).await;

    assert_eq!(loaded.work_duration_secs, 3000);
    assert_eq!(loaded.short_break_duration_secs, 600);
    assert_eq!(loaded.theme, Theme::Dark);
    assert_eq!(settings::load_theme(&store), Theme::Dark);
}

#[tokio::test]
async fn settings_failure_falls_back_to_local_values() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/settings")
        .with_status(502)
        .create_async()
        .await;

    let store = MemoryStore::new();
    settings::save_theme(&store, Theme::Dark).unwrap();
    let mut config = Config::default();
    config.timer.work_duration_secs = 1200;

    let loaded = settings::load(Some(&client_for(&server)), &config, &store).await;

    assert_eq!(loaded.work_duration_secs, 1200);
    assert_eq!(loaded.short_break_duration_secs, 300);
    assert_eq!(loaded.theme, Theme::Dark);
}

#[tokio::test]
async fn today_stats_prefer_server_and_fall_back_to_local() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/focus-time/today")
        .with_body(r#"{"data":{"total_focus_time":3000,"breaks_taken":2,"breaks_missed":1}}"#)
        .create_async()
        .await;

    let store = MemoryStore::new();
    let today = stats::local_today();
    let mut saved = klar_core::DailyStats::empty(today);
    saved.record_focus(60);
    stats::save_local(&store, &saved).unwrap();

    let remote = stats::load_today(Some(&client_for(&server)), &store, today).await;
    assert_eq!(remote.focus_seconds_today, 3000);
    assert_eq!(remote.breaks_taken, 2);
    assert_eq!(remote.breaks_missed, 1);

    let fallback = stats::load_today(Some(&unreachable_client()), &store, today).await;
    assert_eq!(fallback, saved);
}
