//! # Domain Entities
//!
//! Core types for the SSO handshake: the payload mapping, the signed
//! envelope, the inbound request extracted from a payload, the redirect
//! produced on success, and the account bound to the handshake.

use crate::domain::errors::SsoError;
use crate::domain::payload;
use crate::domain::secret::SsoSecret;
use crate::domain::signature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Payload field names used by the Discourse protocol.
pub mod fields {
    pub const NONCE: &str = "nonce";
    pub const RETURN_SSO_URL: &str = "return_sso_url";
    pub const EMAIL: &str = "email";
    pub const EXTERNAL_ID: &str = "external_id";
    pub const USERNAME: &str = "username";
    pub const NAME: &str = "name";
    pub const ADMIN: &str = "admin";
    pub const MODERATOR: &str = "moderator";
    pub const REQUIRE_ACTIVATION: &str = "require_activation";
    pub const ADD_GROUPS: &str = "add_groups";

    /// Query parameter carrying the base64 payload.
    pub const SSO_PARAM: &str = "sso";
    /// Query parameter carrying the hex signature.
    pub const SIG_PARAM: &str = "sig";
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Key/value mapping carried inside the `sso` parameter.
///
/// Keys are kept sorted so that encoding the same mapping twice produces the
/// same text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsoPayload {
    fields: BTreeMap<String, String>,
}

impl SsoPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Inserts a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns true if the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consumes the payload, returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl From<BTreeMap<String, String>> for SsoPayload {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SsoPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// INBOUND REQUEST
// =============================================================================

/// The two fields the forum sends on the inbound leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    /// Single-use token binding this attempt to one completion.
    pub nonce: String,
    /// Where the browser goes once the handshake completes.
    pub return_sso_url: Url,
    /// The raw `return_sso_url` text, copied unchanged into the response.
    pub return_sso_url_raw: String,
}

impl InboundRequest {
    /// Extracts the nonce and return URL from a decoded payload.
    ///
    /// # Errors
    ///
    /// `SsoError::MalformedPayload` when either field is missing or blank, or
    /// when the return URL is not an absolute `http`/`https` URL.
    pub fn from_payload(payload: &SsoPayload) -> Result<Self, SsoError> {
        let nonce = payload
            .get(fields::NONCE)
            .filter(|n| !n.is_empty())
            .ok_or(SsoError::malformed("missing nonce"))?;

        let raw_url = payload
            .get(fields::RETURN_SSO_URL)
            .filter(|u| !u.is_empty())
            .ok_or(SsoError::malformed("missing return_sso_url"))?;

        let return_sso_url =
            Url::parse(raw_url).map_err(|_| SsoError::malformed("unparsable return_sso_url"))?;

        if !matches!(return_sso_url.scheme(), "http" | "https") {
            return Err(SsoError::malformed("return_sso_url scheme not allowed"));
        }

        Ok(Self {
            nonce: nonce.to_string(),
            return_sso_url,
            return_sso_url_raw: raw_url.to_string(),
        })
    }
}

// =============================================================================
// SIGNED ENVELOPE
// =============================================================================

/// An encoded payload together with its HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Base64 of the query-string payload.
    pub sso: String,
    /// Lowercase hex HMAC-SHA256 of `sso`.
    pub sig: String,
}

impl SignedEnvelope {
    /// Encodes and signs a payload.
    pub fn seal(payload: &SsoPayload, secret: &SsoSecret) -> Self {
        let sso = payload::encode(payload);
        let sig = signature::sign(&sso, secret.as_bytes());
        Self { sso, sig }
    }

    /// Checks the signature against the encoded text.
    pub fn verify(&self, secret: &SsoSecret) -> bool {
        signature::verify(&self.sso, &self.sig, secret.as_bytes())
    }

    /// Decodes the payload. Only meaningful after [`SignedEnvelope::verify`].
    pub fn open(&self) -> Result<SsoPayload, SsoError> {
        payload::decode(&self.sso)
    }
}

// =============================================================================
// REDIRECT
// =============================================================================

/// The terminal result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoRedirect {
    /// The signed outbound envelope.
    pub envelope: SignedEnvelope,
    /// `{return_sso_url}?sso=..&sig=..`
    pub location: String,
}

impl SsoRedirect {
    /// Appends the envelope to the forum's return URL.
    ///
    /// Existing query parameters on the return URL are preserved.
    pub fn new(return_sso_url: &Url, envelope: SignedEnvelope) -> Self {
        let mut url = return_sso_url.clone();
        url.query_pairs_mut()
            .append_pair(fields::SSO_PARAM, &envelope.sso)
            .append_pair(fields::SIG_PARAM, &envelope.sig);

        Self {
            envelope,
            location: url.into(),
        }
    }
}

// =============================================================================
// USER ACCOUNT
// =============================================================================

/// Lifecycle state of an archive account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Enabled,
    Pending,
    Disabled,
}

/// An authenticated archive account as supplied by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Stable account identifier, sent as `external_id`.
    pub id: String,
    /// Login name, sent as `username`.
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub moderator: bool,
    /// Names of the groups the account belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserAccount {
    /// An account is activated once its email is verified and it is enabled.
    pub fn is_activated(&self) -> bool {
        self.email_verified && self.status == AccountStatus::Enabled
    }

    /// `"first last"`, or `None` when both parts are blank.
    pub fn display_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}
