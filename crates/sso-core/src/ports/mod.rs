//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//!
//! - `inbound`: Driving ports (API this crate provides)
//! - `outbound`: Driven ports (settings and sessions this crate needs)

pub mod inbound;
pub mod outbound;
