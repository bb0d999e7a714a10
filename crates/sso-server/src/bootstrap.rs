//! Startup wiring: settings seeded from the environment and sessions loaded
//! from an optional JSON file.

use anyhow::{Context, Result};
use sso_core::{
    parse_setting_value, InMemorySessionStore, InMemorySettingsStore, SettingKey, SettingsStore,
};
use std::path::Path;
use tracing::{info, warn};

/// Builds the settings store from `DISCOURSE_SSO_SECRET` and
/// `DISCOURSE_SSO_REQUIRE_ACTIVATION`, applying the same validation as the
/// settings endpoint.
pub fn seed_settings<F>(lookup: F) -> Result<InMemorySettingsStore>
where
    F: Fn(&str) -> Option<String>,
{
    let store = InMemorySettingsStore::new();

    match lookup("DISCOURSE_SSO_SECRET") {
        Some(secret) => {
            // The secret is always a string, even when it looks like JSON
            store
                .put(SettingKey::SsoSecret, &serde_json::Value::String(secret))
                .context("DISCOURSE_SSO_SECRET is invalid")?;
        }
        None => warn!("DISCOURSE_SSO_SECRET not set; handshakes fail until an admin sets it"),
    }

    if let Some(flag) = lookup("DISCOURSE_SSO_REQUIRE_ACTIVATION") {
        store
            .put(SettingKey::RequireActivation, &parse_setting_value(&flag))
            .context("DISCOURSE_SSO_REQUIRE_ACTIVATION must be true or false")?;
    }

    Ok(store)
}

/// Loads sessions from `path`, or starts empty when no path is given.
pub fn load_sessions(path: Option<&Path>) -> Result<InMemorySessionStore> {
    let Some(path) = path else {
        return Ok(InMemorySessionStore::new());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read sessions file {}", path.display()))?;
    let store = InMemorySessionStore::from_json(&json)
        .with_context(|| format!("failed to parse sessions file {}", path.display()))?;

    info!(path = %path.display(), sessions = store.len(), "Loaded sessions");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_seed_from_env() {
        let store = seed_settings(lookup(&[
            ("DISCOURSE_SSO_SECRET", "1234567890"),
            ("DISCOURSE_SSO_REQUIRE_ACTIVATION", "true"),
        ]))
        .unwrap();

        // A numeric-looking secret stays a string
        assert_eq!(store.get(SettingKey::SsoSecret), json!("1234567890"));
        assert!(store.snapshot().require_activation);
    }

    #[test]
    fn test_seed_without_secret() {
        let store = seed_settings(lookup(&[])).unwrap();
        assert!(store.snapshot().secret.is_none());
    }

    #[test]
    fn test_seed_rejects_short_secret() {
        let err = seed_settings(lookup(&[("DISCOURSE_SSO_SECRET", "short")])).unwrap_err();
        assert!(format!("{err:#}").contains("at least 10 characters"));
    }

    #[test]
    fn test_seed_rejects_bad_flag() {
        assert!(seed_settings(lookup(&[("DISCOURSE_SSO_REQUIRE_ACTIVATION", "maybe")])).is_err());
    }

    #[test]
    fn test_load_sessions_missing_file() {
        let err = load_sessions(Some(Path::new("/nonexistent/sessions.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to read sessions file"));
    }

    #[test]
    fn test_load_sessions_from_file() {
        let path = std::env::temp_dir().join(format!("sso-sessions-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"token": "t", "account": {"id": "1", "login": "a", "email": "a@example.com"}}]"#,
        )
        .unwrap();

        let store = load_sessions(Some(&path)).unwrap();
        assert_eq!(store.len(), 1);
        std::fs::remove_file(&path).unwrap();
    }
}
