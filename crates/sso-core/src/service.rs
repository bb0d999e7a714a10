//! # Handshake Service
//!
//! Application service implementing [`SsoHandshakeApi`].
//!
//! ## Architecture
//!
//! - Implements the inbound port (`SsoHandshakeApi`)
//! - Reads the outbound `SettingsStore` once per handshake
//! - Resolves sessions through the outbound `SessionProvider`
//! - Delegates codec, signing and replay checks to the domain layer
//!
//! ## Ordering
//!
//! ```text
//! snapshot settings → verify sig → decode → bind user → claim nonce → sign
//! ```
//!
//! The nonce is claimed only after the user is bound, so a login or
//! activation failure leaves it available for a later attempt.

use crate::domain::entities::{
    fields, InboundRequest, SignedEnvelope, SsoPayload, SsoRedirect, UserAccount,
};
use crate::domain::errors::SsoError;
use crate::domain::replay::{ReplayGuard, DEFAULT_NONCE_TTL};
use crate::ports::inbound::SsoHandshakeApi;
use crate::ports::outbound::{SessionProvider, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// SSO handshake orchestrator.
pub struct HandshakeService<S: SettingsStore + ?Sized, P: SessionProvider + ?Sized> {
    settings: Arc<S>,
    sessions: Arc<P>,
    replay: Arc<ReplayGuard>,
    nonce_ttl: Duration,
}

impl<S: SettingsStore + ?Sized, P: SessionProvider + ?Sized> HandshakeService<S, P> {
    /// Creates a service with a fresh replay guard and the default nonce TTL.
    pub fn new(settings: Arc<S>, sessions: Arc<P>) -> Self {
        Self {
            settings,
            sessions,
            replay: Arc::new(ReplayGuard::new()),
            nonce_ttl: DEFAULT_NONCE_TTL,
        }
    }

    /// Shares an existing replay guard (e.g. one swept by a background task).
    #[must_use]
    pub fn with_replay_guard(mut self, replay: Arc<ReplayGuard>) -> Self {
        self.replay = replay;
        self
    }

    /// Overrides how long a claimed nonce stays blocked.
    #[must_use]
    pub fn with_nonce_ttl(mut self, ttl: Duration) -> Self {
        self.nonce_ttl = ttl;
        self
    }

    pub fn settings(&self) -> &Arc<S> {
        &self.settings
    }

    pub fn sessions(&self) -> &Arc<P> {
        &self.sessions
    }

    pub fn replay_guard(&self) -> &Arc<ReplayGuard> {
        &self.replay
    }

    pub fn nonce_ttl(&self) -> Duration {
        self.nonce_ttl
    }

    /// Looks up the account behind a session token.
    pub async fn resolve_user(&self, token: Option<&str>) -> Option<UserAccount> {
        match token {
            Some(token) if !token.is_empty() => self.sessions.resolve(token).await,
            _ => None,
        }
    }

    /// Resolves the session and completes the handshake in one call.
    pub async fn handshake(
        &self,
        sso: &str,
        sig: &str,
        token: Option<&str>,
    ) -> Result<SsoRedirect, SsoError> {
        let user = self.resolve_user(token).await;
        self.complete(sso, sig, user.as_ref())
    }
}

/// Builds the outbound payload for `user`.
fn build_response(request: &InboundRequest, user: &UserAccount) -> SsoPayload {
    let mut payload = SsoPayload::new();
    payload.insert(fields::NONCE, request.nonce.as_str());
    payload.insert(fields::RETURN_SSO_URL, request.return_sso_url_raw.as_str());
    payload.insert(fields::EMAIL, user.email.as_str());
    payload.insert(fields::EXTERNAL_ID, user.id.as_str());
    payload.insert(fields::USERNAME, user.login.as_str());
    if let Some(name) = user.display_name() {
        payload.insert(fields::NAME, name);
    }
    payload.insert(fields::ADMIN, user.admin.to_string());
    payload.insert(fields::MODERATOR, user.moderator.to_string());
    payload.insert(
        fields::REQUIRE_ACTIVATION,
        (!user.email_verified).to_string(),
    );
    if !user.groups.is_empty() {
        payload.insert(fields::ADD_GROUPS, user.groups.join(","));
    }
    payload
}

impl<S: SettingsStore + ?Sized, P: SessionProvider + ?Sized> SsoHandshakeApi
    for HandshakeService<S, P>
{
    fn complete(
        &self,
        sso: &str,
        sig: &str,
        user: Option<&UserAccount>,
    ) -> Result<SsoRedirect, SsoError> {
        // One snapshot so verify and sign use the same secret
        let settings = self.settings.snapshot();
        let secret = settings.secret()?;

        let inbound = SignedEnvelope {
            sso: sso.to_string(),
            sig: sig.to_string(),
        };
        if !inbound.verify(&secret) {
            warn!("SSO signature mismatch");
            return Err(SsoError::InvalidSignature);
        }

        let request = InboundRequest::from_payload(&inbound.open()?)?;

        let user = user.ok_or(SsoError::NotAuthenticated)?;
        if settings.require_activation && !user.is_activated() {
            debug!(user_id = %user.id, "Account not activated");
            return Err(SsoError::AccountNotActivated);
        }

        self.replay.claim(&request.nonce, self.nonce_ttl)?;

        let envelope = SignedEnvelope::seal(&build_response(&request, user), &secret);
        debug!(user_id = %user.id, host = ?request.return_sso_url.host_str(), "SSO handshake complete");

        Ok(SsoRedirect::new(&request.return_sso_url, envelope))
    }
}
