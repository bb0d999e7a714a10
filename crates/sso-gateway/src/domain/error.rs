//! Gateway error types.
//!
//! `ApiError` is what a client sees: a status and a small JSON body in the
//! shape the archive's web client already understands. `GatewayError` covers
//! failures of the server itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use sso_core::{SettingsError, SsoError};

/// Body `type` for ordinary REST failures.
pub const KIND_REST: &str = "rest";
/// Body `type` for rejected field values.
pub const KIND_VALIDATION: &str = "validation";

/// Client-facing error.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    /// `rest` or `validation`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The request field at fault, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub message: String,
}

impl ApiError {
    /// Create a new REST error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: KIND_REST,
            field: None,
            message: message.into(),
        }
    }

    /// A 400 naming the offending field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: KIND_VALIDATION,
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "You must be logged in.")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Administrator access required.")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut response = (status, Json(self)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<SsoError> for ApiError {
    fn from(err: SsoError) -> Self {
        match err {
            SsoError::MalformedPayload { .. } => Self::bad_request("Bad request."),
            SsoError::InvalidSignature => Self::bad_request("Digest mismatch."),
            SsoError::ReplayDetected => {
                Self::new(StatusCode::CONFLICT, "This sign-in link has already been used.")
            }
            SsoError::AccountNotActivated => Self::new(
                StatusCode::FORBIDDEN,
                "Account is not activated. Verify your email address and try again.",
            ),
            SsoError::NotAuthenticated => Self::unauthorized(),
            SsoError::MissingConfiguration => {
                Self::internal("Discourse SSO is not configured.")
            }
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::UnknownKey(_) => Self::validation("key", err.to_string()),
            SettingsError::Validation { field, message } => Self::validation(field, message),
        }
    }
}

/// Gateway service errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// `start` was called twice
    #[error("gateway already started")]
    AlreadyStarted,
}
