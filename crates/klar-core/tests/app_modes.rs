//! Login and logout through the running app.
//!
//! Signing in switches tasks, durations and stats to the backend; signing out
//! goes back to the local snapshot.

use std::sync::Arc;

use klar_core::storage::keys;
use klar_core::window::RenderFn;
use klar_core::{
    App, Config, HeadlessWindowManager, KeyValueStore, MemoryStore, Snapshot, Theme, UserSettings,
    WidgetKind, WindowManager,
};
use mockito::{Matcher, Server};
use serde_json::json;

fn config_for(server: &Server) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api", server.url());
    config.api.timeout_secs = 5;
    config
}

async fn launch(config: Config, store: Arc<dyn KeyValueStore>) -> App {
    let render: RenderFn = Arc::new(|_: WidgetKind, _: &Snapshot| {});
    App::launch(config, store, move |bus, bridge| {
        let manager: Arc<dyn WindowManager> =
            Arc::new(HeadlessWindowManager::new(bus.clone(), bridge.clone(), render));
        manager
    })
    .await
    .unwrap()
}

async fn mock_profile(server: &mut Server) {
    server
        .mock("GET", "/api/auth/me")
        .match_header("authorization", "Bearer tok")
        .with_body(json!({ "user": { "id": "u1", "name": "Ada", "email": "ada@example.com" } }).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/settings")
        .with_body(json!({ "data": { "workDuration": 1200, "shortBreakDuration": 240 } }).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/focus-time/today")
        .with_body(json!({ "totalFocusTime": 3000, "breaksTaken": 2 }).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/tasks")
        .with_body(json!({ "data": [{ "id": "r1", "title": "Remote", "completed": true }] }).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn login_switches_to_remote_and_logout_back_to_local() {
    let mut server = Server::new_async().await;
    mock_profile(&mut server).await;
    let logout = server
        .mock("POST", "/api/auth/logout")
        .with_body("{}")
        .create_async()
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut app = launch(config_for(&server), Arc::clone(&store)).await;
    assert!(app.user().is_none());
    assert_eq!(app.tasks().snapshot().await.unwrap().total_tasks, 5);

    app.login("tok").await.unwrap();

    assert_eq!(app.user().map(|u| u.name.as_str()), Some("Ada"));
    assert_eq!(app.settings().work_duration_secs, 1200);
    let tasks = app.tasks().snapshot().await.unwrap();
    assert_eq!(tasks.total_tasks, 1);
    assert_eq!(tasks.tasks[0].id, "r1");
    assert_eq!(tasks.completion_percentage, 100);
    let status = app.timer().status().await.unwrap();
    assert_eq!(status.durations.work_secs, 1200);
    assert_eq!(status.durations.break_secs, 240);
    assert_eq!(status.state.seconds_remaining, 1200);
    assert_eq!(status.stats.focus_seconds_today, 3000);
    assert_eq!(status.stats.breaks_taken, 2);
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("tok"));

    app.logout().await.unwrap();

    logout.assert_async().await;
    assert!(app.user().is_none());
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
    let tasks = app.tasks().snapshot().await.unwrap();
    assert_eq!(tasks.total_tasks, 5);
    assert!(tasks.tasks.iter().all(|t| t.id != "r1"));
    let status = app.timer().status().await.unwrap();
    assert_eq!(status.durations.work_secs, 1500);
    assert_eq!(status.stats.focus_seconds_today, 0);

    app.shutdown().await;
}

#[tokio::test]
async fn rejected_login_keeps_local_mode() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .with_status(401)
        .create_async()
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut app = launch(config_for(&server), Arc::clone(&store)).await;

    assert!(app.login("bad").await.is_err());
    assert!(app.user().is_none());
    assert_eq!(app.tasks().snapshot().await.unwrap().total_tasks, 5);
    assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);

    app.shutdown().await;
}

#[tokio::test]
async fn signed_in_settings_update_is_saved_remotely_and_applied() {
    let mut server = Server::new_async().await;
    mock_profile(&mut server).await;
    let put = server
        .mock("PUT", "/api/settings")
        .match_body(Matcher::PartialJson(json!({ "workDuration": 900, "theme": "dark" })))
        .with_body(json!({ "workDuration": 900, "shortBreakDuration": 240, "theme": "dark" }).to_string())
        .create_async()
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut app = launch(config_for(&server), Arc::clone(&store)).await;
    app.login("tok").await.unwrap();

    let mut wanted = app.settings().clone();
    wanted.work_duration_secs = 900;
    wanted.theme = Theme::Dark;
    app.update_settings(wanted).await.unwrap();

    put.assert_async().await;
    assert_eq!(app.timer().status().await.unwrap().durations.work_secs, 900);
    assert_eq!(store.get(keys::THEME).unwrap().as_deref(), Some("dark"));

    let invalid = UserSettings {
        work_duration_secs: 0,
        ..app.settings().clone()
    };
    assert!(app.update_settings(invalid).await.is_err());

    app.shutdown().await;
}
