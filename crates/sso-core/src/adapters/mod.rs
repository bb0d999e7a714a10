//! # Adapters Layer
//!
//! In-memory implementations of the outbound ports.

pub mod session_store;
pub mod settings_store;

pub use session_store::{InMemorySessionStore, SessionEntry};
pub use settings_store::InMemorySettingsStore;
