//! # In-Memory Settings Store
//!
//! `RwLock`-guarded settings; every handshake takes a snapshot under the read
//! lock.

use crate::domain::errors::SettingsError;
use crate::domain::settings::{SettingKey, SsoSettings};
use crate::ports::outbound::SettingsStore;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

/// Process-local settings store.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: RwLock<SsoSettings>,
}

impl InMemorySettingsStore {
    /// Creates an empty store (no secret, activation not required).
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn snapshot(&self) -> SsoSettings {
        self.settings.read().clone()
    }

    fn get(&self, key: SettingKey) -> Value {
        self.settings.read().value_of(key)
    }

    fn put(&self, key: SettingKey, value: &Value) -> Result<(), SettingsError> {
        // Validate before taking the write lock
        let validated = key.validate(value)?;
        self.settings.write().apply(validated);
        info!(key = %key, "Setting updated");
        Ok(())
    }

    fn put_many(&self, entries: &[(SettingKey, Value)]) -> Result<(), SettingsError> {
        let validated = entries
            .iter()
            .map(|(key, value)| key.validate(value).map(|v| (*key, v)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut settings = self.settings.write();
        for (key, value) in validated {
            settings.apply(value);
            info!(key = %key, "Setting updated");
        }
        Ok(())
    }

    fn reset(&self, key: SettingKey) {
        self.settings.write().reset(key);
        info!(key = %key, "Setting reset to default");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_then_snapshot() {
        let store = InMemorySettingsStore::new();
        store
            .put(SettingKey::SsoSecret, &json!("0123456789"))
            .unwrap();
        store
            .put(SettingKey::RequireActivation, &json!(true))
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.secret().unwrap().as_bytes(), b"0123456789");
        assert!(snapshot.require_activation);
    }

    #[test]
    fn test_rejected_put_keeps_old_value() {
        let store = InMemorySettingsStore::new();
        store
            .put(SettingKey::SsoSecret, &json!("0123456789"))
            .unwrap();

        let err = store
            .put(SettingKey::SsoSecret, &json!("short"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Discourse SSO secret must be at least 10 characters."
        );
        assert_eq!(store.get(SettingKey::SsoSecret), json!("0123456789"));
    }

    #[test]
    fn test_snapshot_survives_rotation() {
        let store = InMemorySettingsStore::new();
        store
            .put(SettingKey::SsoSecret, &json!("0123456789"))
            .unwrap();
        let before = store.snapshot();

        store
            .put(SettingKey::SsoSecret, &json!("j2zNLBXBsurcU0LfypwR"))
            .unwrap();

        assert_eq!(before.secret().unwrap().as_bytes(), b"0123456789");
        assert_eq!(
            store.snapshot().secret().unwrap().as_bytes(),
            b"j2zNLBXBsurcU0LfypwR"
        );
    }

    #[test]
    fn test_put_many_is_all_or_nothing() {
        let store = InMemorySettingsStore::new();
        let err = store
            .put_many(&[
                (SettingKey::RequireActivation, json!(true)),
                (SettingKey::SsoSecret, json!("short")),
            ])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Discourse SSO secret must be at least 10 characters."
        );
        assert!(!store.snapshot().require_activation);

        store
            .put_many(&[
                (SettingKey::SsoSecret, json!("1234567890")),
                (SettingKey::RequireActivation, json!(true)),
            ])
            .unwrap();
        assert_eq!(store.get(SettingKey::SsoSecret), json!("1234567890"));
        assert!(store.snapshot().require_activation);
    }

    #[test]
    fn test_reset() {
        let store = InMemorySettingsStore::new();
        store
            .put(SettingKey::SsoSecret, &json!("0123456789"))
            .unwrap();
        store.reset(SettingKey::SsoSecret);
        assert_eq!(store.get(SettingKey::SsoSecret), Value::Null);
    }
}
