//! Middleware stack for the gateway.

pub mod auth;
pub mod tracing;

pub use auth::{constant_time_compare, AdminAuthLayer, AdminAuthService};
pub use self::tracing::{RequestTracingLayer, RequestTracingService, REQUEST_ID_HEADER};
