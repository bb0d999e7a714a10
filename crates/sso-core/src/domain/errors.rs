//! # SSO Errors
//!
//! Error types for the handshake and for settings validation.

use crate::domain::replay::ReplayDetected;
use thiserror::Error;

/// Errors that terminate a handshake attempt.
///
/// None of the variants carry payload content or signature material, so they
/// are safe to surface to the browser.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SsoError {
    /// The payload could not be decoded or lacks a required field.
    #[error("Malformed SSO payload: {reason}")]
    MalformedPayload { reason: &'static str },

    /// The HMAC signature does not match the payload.
    #[error("Digest mismatch")]
    InvalidSignature,

    /// The nonce was already claimed inside the replay window.
    #[error("Nonce has already been used")]
    ReplayDetected,

    /// Activation is required and the account is not activated.
    #[error("Account is not activated")]
    AccountNotActivated,

    /// No authenticated user is bound to the request.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The shared secret has not been set by an administrator.
    #[error("Setting discourse_sso.sso_secret is not set")]
    MissingConfiguration,
}

impl SsoError {
    /// Creates a malformed-payload error with a static reason.
    pub fn malformed(reason: &'static str) -> Self {
        Self::MalformedPayload { reason }
    }

    /// Stable label used for metrics and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::InvalidSignature => "invalid_signature",
            Self::ReplayDetected => "replay_detected",
            Self::AccountNotActivated => "account_not_activated",
            Self::NotAuthenticated => "not_authenticated",
            Self::MissingConfiguration => "missing_configuration",
        }
    }
}

impl From<ReplayDetected> for SsoError {
    fn from(_: ReplayDetected) -> Self {
        Self::ReplayDetected
    }
}

/// Errors from reading or writing SSO settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The key is not one of the SSO settings.
    #[error("Invalid setting key: {0}")]
    UnknownKey(String),

    /// The value failed validation for its key.
    #[error("{message}")]
    Validation {
        /// Name of the rejected request field.
        field: &'static str,
        /// Human readable reason, shown inline by the admin UI.
        message: String,
    },
}

impl SettingsError {
    /// Creates a validation error on the `value` field.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::Validation {
            field: "value",
            message: message.into(),
        }
    }
}
