//! REST client for the Klar backend.

use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::{json, Value};
use url::Url;

use super::wire::{self, TodayStats};
use crate::auth::User;
use crate::error::ApiError;
use crate::settings::UserSettings;
use crate::task::Task;
use crate::timer::Phase;

/// Partial update of a backend session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub actual_duration_secs: u64,
    /// `Some(false)` marks a session abandoned by a manual stop.
    pub completed: Option<bool>,
}

/// Authenticated client. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `base_url` authenticating with `token`.
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        Url::parse(base_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    /// Send a request and return the unwrapped JSON payload.
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, %url, "backend request");

        let mut req = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = wire::parse_body(&text)
                .ok()
                .and_then(|v| wire::error_message(&v))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(wire::unwrap_envelope(wire::parse_body(&text)?))
    }

    // ── Auth ─────────────────────────────────────────────────────────

    pub async fn current_user(&self) -> Result<User, ApiError> {
        let value = self.request(Method::GET, "/auth/me", None).await?;
        wire::user(&value)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.request(Method::POST, "/auth/logout", None).await?;
        Ok(())
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub async fn settings(&self) -> Result<UserSettings, ApiError> {
        let value = self.request(Method::GET, "/settings", None).await?;
        wire::settings(&value)
    }

    pub async fn update_settings(&self, settings: &UserSettings) -> Result<UserSettings, ApiError> {
        let value = self
            .request(Method::PUT, "/settings", Some(wire::settings_body(settings)))
            .await?;
        wire::settings(&value)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let value = self.request(Method::GET, "/tasks", None).await?;
        Ok(wire::task_list(&value))
    }

    pub async fn create_task(&self, title: &str) -> Result<Task, ApiError> {
        let body = json!({ "title": title, "completed": false });
        let value = self.request(Method::POST, "/tasks", Some(body)).await?;
        let submitted = Task {
            id: String::new(),
            title: title.to_string(),
            completed: false,
        };
        wire::task(&value, Some(&submitted))
    }

    /// Toggle `current` on the server; fields the response omits are taken
    /// from `current`.
    pub async fn toggle_task(&self, current: &Task) -> Result<Task, ApiError> {
        let path = format!("/tasks/{}/toggle", urlencoding::encode(&current.id));
        let value = self.request(Method::PATCH, &path, None).await?;
        wire::task(&value, Some(current))
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/tasks/{}", urlencoding::encode(id));
        self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Open a session and return its backend id.
    pub async fn create_session(
        &self,
        planned_minutes: u64,
        phase: Phase,
        task_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let body = json!({
            "duration": planned_minutes,
            "type": phase.as_str(),
            "taskId": task_id,
        });
        let value = self.request(Method::POST, "/sessions", Some(body)).await?;
        wire::session_id(&value)
    }

    pub async fn update_session(&self, id: &str, update: &SessionUpdate) -> Result<(), ApiError> {
        let mut body = json!({ "actualDuration": update.actual_duration_secs });
        if let Some(completed) = update.completed {
            body["completed"] = Value::Bool(completed);
        }
        let path = format!("/sessions/{}", urlencoding::encode(id));
        self.request(Method::PUT, &path, Some(body)).await?;
        Ok(())
    }

    pub async fn complete_session(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/sessions/{}/complete", urlencoding::encode(id));
        self.request(Method::POST, &path, None).await?;
        Ok(())
    }

    // ── Stats ────────────────────────────────────────────────────────

    pub async fn today_stats(&self) -> Result<TodayStats, ApiError> {
        let value = self.request(Method::GET, "/focus-time/today", None).await?;
        Ok(wire::today_stats(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", "t", Duration::from_secs(1)),
            Err(ApiError::Url(_))
        ));
    }

    #[test]
    fn endpoint_appends_path_without_double_slash() {
        let client = ApiClient::new("http://localhost:3001/api/", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint("/tasks").unwrap().as_str(),
            "http://localhost:3001/api/tasks"
        );
    }

    #[test]
    fn debug_does_not_leak_token() {
        let client = ApiClient::new("http://localhost:3001/api", "secret", Duration::from_secs(1)).unwrap();
        assert!(!format!("{client:?}").contains("secret"));
    }
}
