//! # SSO Settings
//!
//! The two administrator-controlled settings and their validation rules.
//!
//! Values arrive as JSON (the REST endpoint parses `value` as JSON when it can
//! and otherwise treats it as a plain string), so validation works on
//! [`serde_json::Value`].

use crate::domain::errors::{SettingsError, SsoError};
use crate::domain::secret::{SsoSecret, MIN_SECRET_LEN};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Keys of the settings owned by the SSO provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// `discourse_sso.sso_secret`
    SsoSecret,
    /// `discourse_sso.require_activation`
    RequireActivation,
}

impl SettingKey {
    /// Every known key.
    pub const ALL: [SettingKey; 2] = [SettingKey::SsoSecret, SettingKey::RequireActivation];

    /// The wire name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SsoSecret => "discourse_sso.sso_secret",
            Self::RequireActivation => "discourse_sso.require_activation",
        }
    }

    /// Validates a raw value for this key.
    ///
    /// # Errors
    ///
    /// `SettingsError::Validation` with a message suitable for the admin UI.
    pub fn validate(self, value: &Value) -> Result<SettingValue, SettingsError> {
        match self {
            Self::SsoSecret => validate_secret(value).map(SettingValue::SsoSecret),
            Self::RequireActivation => {
                validate_require_activation(value).map(SettingValue::RequireActivation)
            }
        }
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated setting value, ready to be stored.
#[derive(Debug, Clone)]
pub enum SettingValue {
    SsoSecret(SsoSecret),
    RequireActivation(bool),
}

fn validate_secret(value: &Value) -> Result<SsoSecret, SettingsError> {
    let secret = match value {
        Value::Null => return Err(SettingsError::invalid_value("Discourse SSO secret is required.")),
        Value::String(s) => s,
        _ => {
            return Err(SettingsError::invalid_value(
                "Discourse SSO secret must be a string.",
            ))
        }
    };

    if secret.is_empty() {
        return Err(SettingsError::invalid_value("Discourse SSO secret is required."));
    }
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(SettingsError::invalid_value(format!(
            "Discourse SSO secret must be at least {MIN_SECRET_LEN} characters."
        )));
    }

    Ok(SsoSecret::new(secret))
}

fn validate_require_activation(value: &Value) -> Result<bool, SettingsError> {
    value.as_bool().ok_or_else(|| {
        SettingsError::invalid_value("Require activation setting must be a boolean.")
    })
}

/// Interprets a raw request parameter: JSON when it parses, else a string.
pub fn parse_setting_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Snapshot of the SSO settings, read once per handshake.
///
/// The secret sits behind an `Arc` so snapshots are cheap and a handshake
/// keeps using one secret even if an administrator rotates it mid-flight.
#[derive(Debug, Clone, Default)]
pub struct SsoSettings {
    pub secret: Option<Arc<SsoSecret>>,
    pub require_activation: bool,
}

impl SsoSettings {
    /// Returns the configured secret.
    ///
    /// # Errors
    ///
    /// `SsoError::MissingConfiguration` when no secret has been set.
    pub fn secret(&self) -> Result<Arc<SsoSecret>, SsoError> {
        self.secret.clone().ok_or(SsoError::MissingConfiguration)
    }

    /// Stores a validated value.
    pub fn apply(&mut self, value: SettingValue) {
        match value {
            SettingValue::SsoSecret(secret) => self.secret = Some(Arc::new(secret)),
            SettingValue::RequireActivation(flag) => self.require_activation = flag,
        }
    }

    /// Restores the default for `key`.
    pub fn reset(&mut self, key: SettingKey) {
        match key {
            SettingKey::SsoSecret => self.secret = None,
            SettingKey::RequireActivation => self.require_activation = false,
        }
    }

    /// The current value of `key` as JSON. Unset secrets are `null`.
    pub fn value_of(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::SsoSecret => self
                .secret
                .as_ref()
                .and_then(|s| s.as_str())
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            SettingKey::RequireActivation => Value::Bool(self.require_activation),
        }
    }
}
