//! # In-Memory Session Store
//!
//! Maps session tokens to accounts. Used by the standalone server, seeded from
//! a JSON file, and by tests.

use crate::domain::entities::UserAccount;
use crate::ports::outbound::SessionProvider;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;

/// One `{token, account}` record in a sessions file.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionEntry {
    pub token: String,
    pub account: UserAccount,
}

/// Process-local session provider.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, UserAccount>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads sessions from a JSON array of `{token, account}` entries.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the document does not match that shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<SessionEntry> = serde_json::from_str(json)?;
        Ok(entries.into_iter().collect())
    }

    /// Binds `token` to `account`, replacing any previous binding.
    pub fn insert(&self, token: impl Into<String>, account: UserAccount) {
        self.sessions.write().insert(token.into(), account);
    }

    /// Drops the session for `token`.
    pub fn remove(&self, token: &str) -> Option<UserAccount> {
        self.sessions.write().remove(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl FromIterator<SessionEntry> for InMemorySessionStore {
    fn from_iter<I: IntoIterator<Item = SessionEntry>>(iter: I) -> Self {
        Self {
            sessions: RwLock::new(
                iter.into_iter()
                    .map(|entry| (entry.token, entry.account))
                    .collect(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl SessionProvider for InMemorySessionStore {
    async fn resolve(&self, token: &str) -> Option<UserAccount> {
        self.sessions.read().get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSIONS: &str = r#"[
        {"token": "tok-alice", "account": {"id": "42", "login": "alice", "email": "a@example.com", "emailVerified": true}},
        {"token": "tok-bob", "account": {"id": "43", "login": "bob", "email": "b@example.com", "status": "pending"}}
    ]"#;

    #[tokio::test]
    async fn test_resolve_from_json() {
        let store = InMemorySessionStore::from_json(SESSIONS).unwrap();
        assert_eq!(store.len(), 2);

        let alice = store.resolve("tok-alice").await.unwrap();
        assert_eq!(alice.login, "alice");
        assert!(alice.is_activated());

        let bob = store.resolve("tok-bob").await.unwrap();
        assert!(!bob.is_activated());

        assert!(store.resolve("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let store = InMemorySessionStore::new();
        let account: UserAccount = serde_json::from_str(
            r#"{"id": "1", "login": "carol", "email": "c@example.com"}"#,
        )
        .unwrap();

        store.insert("tok", account);
        assert!(store.resolve("tok").await.is_some());

        store.remove("tok");
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        assert!(InMemorySessionStore::from_json(r#"{"token": "x"}"#).is_err());
    }
}
