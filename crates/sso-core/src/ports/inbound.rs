//! # Inbound Ports (Driving Ports / API)
//!
//! The handshake API exposed to the HTTP gateway.

use crate::domain::entities::{SsoRedirect, UserAccount};
use crate::domain::errors::SsoError;

/// Primary SSO handshake API.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait SsoHandshakeApi: Send + Sync {
    /// Completes one handshake for the inbound `(sso, sig)` pair.
    ///
    /// `user` is the account bound to the browser session, if any.
    ///
    /// # Errors
    ///
    /// - `SsoError::MissingConfiguration` - No secret has been set
    /// - `SsoError::InvalidSignature` - `sig` does not match `sso`
    /// - `SsoError::MalformedPayload` - Undecodable payload or missing fields
    /// - `SsoError::NotAuthenticated` - `user` is `None`
    /// - `SsoError::AccountNotActivated` - Activation required but missing
    /// - `SsoError::ReplayDetected` - The nonce was already used
    fn complete(
        &self,
        sso: &str,
        sig: &str,
        user: Option<&UserAccount>,
    ) -> Result<SsoRedirect, SsoError>;
}
