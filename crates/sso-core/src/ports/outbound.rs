//! # Outbound Ports (Driven Ports / SPI)
//!
//! Settings storage and session lookup, supplied by the host.

use crate::domain::entities::UserAccount;
use crate::domain::errors::SettingsError;
use crate::domain::settings::{SettingKey, SsoSettings};
use serde_json::Value;

/// Storage for the administrator-controlled SSO settings.
///
/// Reads are frequent and writes rare, so implementations should favour
/// cheap concurrent reads.
pub trait SettingsStore: Send + Sync {
    /// A consistent copy of every setting.
    fn snapshot(&self) -> SsoSettings;

    /// The current value of one setting as JSON.
    fn get(&self, key: SettingKey) -> Value;

    /// Validates and stores a value.
    ///
    /// # Errors
    ///
    /// `SettingsError::Validation` when the value is rejected; the stored value
    /// is left unchanged.
    fn put(&self, key: SettingKey, value: &Value) -> Result<(), SettingsError>;

    /// Validates every value, then stores them all together.
    ///
    /// # Errors
    ///
    /// The first validation failure; nothing is stored in that case.
    fn put_many(&self, entries: &[(SettingKey, Value)]) -> Result<(), SettingsError>;

    /// Restores the default for one setting.
    fn reset(&self, key: SettingKey);
}

/// Resolves a session token to the authenticated account.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the account for `token`, or `None` when the token is unknown.
    async fn resolve(&self, token: &str) -> Option<UserAccount>;
}
