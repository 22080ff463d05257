//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use panel_gate::config::PanelConfig;
use panel_gate::http::{AppState, HttpServer};
use panel_gate::lifecycle::{bootstrap, Shutdown};
use panel_gate::settings::{JsonFileSettingsStore, SettingsSource};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";

/// A panel served on an ephemeral port over a JSON settings file.
pub struct TestPanel {
    pub base: String,
    pub state: AppState,
    pub shutdown: Arc<Shutdown>,
    pub store_path: PathBuf,
    _dir: TempDir,
}

impl TestPanel {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// A second handle on the settings file, standing in for an operator
    /// editing it behind the server's back.
    pub fn external_store(&self) -> JsonFileSettingsStore {
        JsonFileSettingsStore::new(self.store_path.clone())
    }
}

impl Drop for TestPanel {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_panel(seed: &[(&str, &str)]) -> TestPanel {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("settings.json");
    let store = Arc::new(JsonFileSettingsStore::new(store_path.clone()));
    for (key, value) in seed {
        store.create(key, value, "").await.unwrap();
    }

    let mut config = PanelConfig::default();
    config.store.path = store_path.display().to_string();
    config.store.seed_defaults = false;
    config.auth.jwt_secret = Some(TEST_SECRET.to_string());

    let state = bootstrap(&config, store).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(state.clone(), Duration::from_secs(5));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestPanel {
        base: format!("http://{addr}"),
        state,
        shutdown,
        store_path,
        _dir: dir,
    }
}

/// Client that does not follow redirects, so the entrance 302 is visible.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub async fn login(panel: &TestPanel, username: &str, password: &str) -> reqwest::Response {
    client()
        .post(panel.url("/api/v1/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap()
}

pub async fn token(panel: &TestPanel, username: &str, password: &str) -> String {
    let res = login(panel, username, password).await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

pub async fn get_authed(panel: &TestPanel, path: &str, token: &str) -> reqwest::Response {
    client()
        .get(panel.url(path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}
