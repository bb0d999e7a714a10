//! # Domain Layer
//!
//! Pure handshake logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod entities;
pub mod errors;
pub mod payload;
pub mod replay;
pub mod secret;
pub mod settings;
pub mod signature;
