//! Backend payload adapter.
//!
//! The backend has shipped several response shapes over time: records may be
//! wrapped in `{ "data": ... }`, fields may be camelCase or snake_case, tasks
//! may carry `text` instead of `title`, and ids may be strings or numbers.
//! Everything is normalized here so the rest of the crate sees one type per
//! record.

use serde_json::Value;

use crate::auth::User;
use crate::error::ApiError;
use crate::settings::{Theme, UserSettings};
use crate::task::Task;

/// Today's totals as computed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TodayStats {
    pub total_focus_seconds: u64,
    pub breaks_taken: u32,
    pub breaks_missed: u32,
}

/// Parse a response body, treating an empty body as `{}`.
pub(crate) fn parse_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Strip a `{ "data": ... }` envelope when present and non-null.
pub(crate) fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(data) => {
                map.insert("data".into(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Error text carried by a failed response, if any.
pub(crate) fn error_message(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn id_field(value: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match value.get(*name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn str_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name)?.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn u64_field(value: &Value, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|name| value.get(*name)?.as_u64())
}

fn bool_field(value: &Value, names: &[&str]) -> Option<bool> {
    names.iter().find_map(|name| value.get(*name)?.as_bool())
}

/// Decode a task record. `fallback` fills in the id and title for servers
/// that echo a record without them (create and toggle responses).
pub(crate) fn task(value: &Value, fallback: Option<&Task>) -> Result<Task, ApiError> {
    if !value.is_object() {
        return Err(ApiError::InvalidResponse("task record is not an object".into()));
    }
    let id = id_field(value, &["id", "_id"])
        .or_else(|| fallback.map(|t| t.id.clone()).filter(|id| !id.is_empty()))
        .ok_or_else(|| ApiError::InvalidResponse("task record has no id".into()))?;
    let title = str_field(value, &["title", "text"])
        .or_else(|| fallback.map(|t| t.title.clone()).filter(|t| !t.is_empty()))
        .ok_or_else(|| ApiError::InvalidResponse(format!("task {id} has no title")))?;
    Ok(Task {
        id,
        title,
        completed: bool_field(value, &["completed"]).unwrap_or(false),
    })
}

/// Decode a task list. Anything that is not an array counts as empty;
/// records without an id or title are skipped.
pub(crate) fn task_list(value: &Value) -> Vec<Task> {
    let Some(items) = value.as_array() else {
        tracing::warn!("task list response is not an array; treating as empty");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match task(item, None) {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::warn!("skipping task record: {e}");
                None
            }
        })
        .collect()
}

/// Id of a freshly created session, whichever field the server used.
pub(crate) fn session_id(value: &Value) -> Result<String, ApiError> {
    id_field(value, &["id", "_id", "session_id", "sessionId"])
        .ok_or_else(|| ApiError::InvalidResponse("session created but no id returned".into()))
}

/// Decode `/auth/me`, which may nest the record under `user`.
pub(crate) fn user(value: &Value) -> Result<User, ApiError> {
    let record = value.get("user").filter(|u| u.is_object()).unwrap_or(value);
    let id = id_field(record, &["id", "sub"])
        .ok_or_else(|| ApiError::InvalidResponse("user record has no id".into()))?;
    Ok(User {
        id,
        email: str_field(record, &["email"]).unwrap_or_default(),
        name: str_field(record, &["name", "login"]).unwrap_or_default(),
        avatar_url: str_field(record, &["avatar_url", "avatarUrl", "picture"]),
    })
}

/// Decode settings (durations in seconds). Missing fields keep defaults;
/// zero durations are ignored.
pub(crate) fn settings(value: &Value) -> Result<UserSettings, ApiError> {
    if !value.is_object() {
        return Err(ApiError::InvalidResponse("settings: expected an object".into()));
    }
    let defaults = UserSettings::default();
    let positive = |names: &[&str], d: u64| u64_field(value, names).filter(|v| *v > 0).unwrap_or(d);
    Ok(UserSettings {
        work_duration_secs: positive(
            &["workDuration", "work_duration"],
            defaults.work_duration_secs,
        ),
        short_break_duration_secs: positive(
            &["shortBreakDuration", "short_break_duration"],
            defaults.short_break_duration_secs,
        ),
        long_break_duration_secs: positive(
            &["longBreakDuration", "long_break_duration"],
            defaults.long_break_duration_secs,
        ),
        sessions_until_long_break: u64_field(
            value,
            &["sessionsUntilLongBreak", "sessions_until_long_break"],
        )
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .unwrap_or(defaults.sessions_until_long_break),
        notifications_enabled: bool_field(
            value,
            &["notificationsEnabled", "notifications_enabled"],
        )
        .unwrap_or(defaults.notifications_enabled),
        theme: str_field(value, &["theme"])
            .as_deref()
            .and_then(Theme::parse)
            .unwrap_or(defaults.theme),
    })
}

/// Encode settings the way the backend stores them.
pub(crate) fn settings_body(settings: &UserSettings) -> Value {
    serde_json::json!({
        "workDuration": settings.work_duration_secs,
        "shortBreakDuration": settings.short_break_duration_secs,
        "longBreakDuration": settings.long_break_duration_secs,
        "sessionsUntilLongBreak": settings.sessions_until_long_break,
        "notificationsEnabled": settings.notifications_enabled,
        "theme": settings.theme.as_str(),
    })
}

/// Decode `/focus-time/today`. A response without a focus total reads as zero.
pub(crate) fn today_stats(value: &Value) -> TodayStats {
    let Some(total_focus_seconds) = u64_field(
        value,
        &["total_focus_time", "totalFocusTime", "totalFocusSeconds"],
    ) else {
        tracing::warn!("focus time response missing total; treating as zero");
        return TodayStats::default();
    };
    let count = |names: &[&str]| {
        u64_field(value, names)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    TodayStats {
        total_focus_seconds,
        breaks_taken: count(&["breaks_taken", "breaksTaken"]),
        breaks_missed: count(&["breaks_missed", "breaksMissed"]),
    }
}
