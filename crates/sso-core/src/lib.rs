//! # Discourse SSO Core
//!
//! Implements the provider side of the Discourse single sign-on handshake.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Payload codec, HMAC signer, replay guard, no I/O
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound interfaces
//! - **Adapters Layer** (`adapters/`): In-memory settings and session stores
//! - **Service Layer** (`service.rs`): The handshake orchestrator
//!
//! ## Handshake
//!
//! ```text
//! Discourse ──(sso, sig)──→ verify HMAC ──→ decode payload ──→ bind user
//!                                                                 │
//! Discourse ←──302/303── {return_sso_url}?sso=..&sig=.. ←── sign ←┘ claim nonce
//! ```
//!
//! ## Security Notes
//!
//! - The signature always covers the base64 text, never the decoded payload
//! - Signatures are compared in constant time
//! - A nonce is accepted once per replay window
//! - The shared secret is zeroized on drop and never printed

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{InMemorySessionStore, InMemorySettingsStore, SessionEntry};
pub use domain::entities::{
    fields, AccountStatus, InboundRequest, SignedEnvelope, SsoPayload, SsoRedirect, UserAccount,
};
pub use domain::errors::{SettingsError, SsoError};
pub use domain::payload::{decode, encode, MAX_ENCODED_PAYLOAD_LEN};
pub use domain::replay::{ReplayDetected, ReplayGuard, DEFAULT_NONCE_TTL, DEFAULT_SWEEP_INTERVAL};
pub use domain::secret::{SsoSecret, MIN_SECRET_LEN};
pub use domain::settings::{parse_setting_value, SettingKey, SettingValue, SsoSettings};
pub use domain::signature::{sign, verify};
pub use ports::inbound::SsoHandshakeApi;
pub use ports::outbound::{SessionProvider, SettingsStore};
pub use service::HandshakeService;
