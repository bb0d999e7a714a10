//! Settings endpoints.
//!
//! `GET|PUT|DELETE /api/v1/system/setting`, admin only.
//!
//! Single key: `?key=..[&value=..]`. `value` is parsed as JSON when it parses
//! and taken as a plain string otherwise, so `value=true` stores a boolean and
//! `value=abc` a string.
//!
//! Batch (what the admin panel sends): `GET ?list=["k1","k2"]` answers with a
//! `{key: value}` object, and `PUT ?list=[{"key":..,"value":..}]` stores typed
//! JSON values, all or nothing. Parameters may also arrive as a
//! form-urlencoded body.

use crate::domain::error::ApiError;
use crate::service::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Form, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use sso_core::{parse_setting_value, SettingKey};
use sso_telemetry::SETTINGS_UPDATES;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct SettingQuery {
    pub key: Option<String>,
    pub value: Option<String>,
    pub list: Option<String>,
}

impl SettingQuery {
    /// Body parameters take precedence over query parameters.
    fn merge(self, body: Option<SettingQuery>) -> Self {
        let Some(body) = body else { return self };
        Self {
            key: body.key.or(self.key),
            value: body.value.or(self.value),
            list: body.list.or(self.list),
        }
    }
}

/// One entry of a batch `PUT`.
#[derive(Debug, Deserialize)]
struct ListEntry {
    key: String,
    #[serde(default)]
    value: Value,
}

fn parse_key(raw: &str) -> Result<SettingKey, ApiError> {
    Ok(raw.parse::<SettingKey>()?)
}

fn require_key(query: &SettingQuery) -> Result<SettingKey, ApiError> {
    let raw = query
        .key
        .as_deref()
        .ok_or_else(|| ApiError::validation("key", "Parameter 'key' or 'list' is required."))?;
    parse_key(raw)
}

fn parse_list<T: serde::de::DeserializeOwned>(raw: &str) -> Result<Vec<T>, ApiError> {
    serde_json::from_str(raw)
        .map_err(|_| ApiError::validation("list", "List was not a valid JSON list."))
}

fn values_of(state: &AppState, keys: impl IntoIterator<Item = SettingKey>) -> Value {
    let settings = state.handshake.settings();
    let map: Map<String, Value> = keys
        .into_iter()
        .map(|key| (key.as_str().to_string(), settings.get(key)))
        .collect();
    Value::Object(map)
}

/// `GET /api/v1/system/setting?key=..` or `?list=[..]`
pub async fn get_setting(
    State(state): State<AppState>,
    Query(query): Query<SettingQuery>,
) -> Result<Json<Value>, ApiError> {
    if let Some(list) = &query.list {
        let keys = parse_list::<String>(list)?
            .iter()
            .map(|raw| parse_key(raw))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Json(values_of(&state, keys)));
    }

    let key = require_key(&query)?;
    Ok(Json(state.handshake.settings().get(key)))
}

/// `PUT /api/v1/system/setting?key=..&value=..` or `?list=[{key, value}, ..]`
pub async fn put_setting(
    State(state): State<AppState>,
    Query(query): Query<SettingQuery>,
    body: Option<Form<SettingQuery>>,
) -> Result<Json<Value>, ApiError> {
    let query = query.merge(body.map(|Form(body)| body));

    if let Some(list) = &query.list {
        let entries = parse_list::<ListEntry>(list)?
            .into_iter()
            .map(|entry| -> Result<_, ApiError> { Ok((parse_key(&entry.key)?, entry.value)) })
            .collect::<Result<Vec<_>, _>>()?;

        state.handshake.settings().put_many(&entries)?;
        for (key, _) in &entries {
            SETTINGS_UPDATES.with_label_values(&[key.as_str()]).inc();
        }
        info!(count = entries.len(), "Settings updated via REST");

        return Ok(Json(values_of(&state, entries.iter().map(|(key, _)| *key))));
    }

    let key = require_key(&query)?;
    let value = query
        .value
        .as_deref()
        .map_or(Value::Null, parse_setting_value);

    let settings = state.handshake.settings();
    settings.put(key, &value)?;
    SETTINGS_UPDATES.with_label_values(&[key.as_str()]).inc();
    info!(key = %key, "Setting updated via REST");

    Ok(Json(settings.get(key)))
}

/// `DELETE /api/v1/system/setting?key=..`
pub async fn delete_setting(
    State(state): State<AppState>,
    Query(query): Query<SettingQuery>,
) -> Result<StatusCode, ApiError> {
    let key = require_key(&query)?;
    state.handshake.settings().reset(key);
    SETTINGS_UPDATES.with_label_values(&[key.as_str()]).inc();
    Ok(StatusCode::NO_CONTENT)
}
