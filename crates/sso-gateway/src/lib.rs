//! # Discourse SSO Gateway
//!
//! The HTTP surface of the SSO provider.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        SSO GATEWAY                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │  GET /discourse_sso            303 → forum (or → login page)  │
//! │  GET /api/v1/discourse_sso     200 {"returnUrl": ...}         │
//! │  GET|PUT|DELETE /api/v1/system/setting   (admin only)         │
//! │  GET /health, GET /metrics                                    │
//! ├───────────────────────────────────────────────────────────────┤
//! │  Middleware: RequestTracing → Timeout → [AdminAuth]           │
//! ├───────────────────────────────────────────────────────────────┤
//! │  sso-core HandshakeService ── SettingsStore / SessionProvider │
//! │  ReplayGuard ← background sweep task                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sso_gateway::{GatewayConfig, SsoGatewayService};
//!
//! let mut gateway = SsoGatewayService::new(GatewayConfig::from_env()?, settings, sessions)?;
//! gateway.start().await?;
//! tokio::signal::ctrl_c().await?;
//! gateway.shutdown().await;
//! ```
//!
//! # Security
//!
//! - Error bodies never echo the payload or signature
//! - Request spans record the path only; the query carries `sso`/`sig`
//! - Admin API keys are compared in constant time

pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod service;
pub mod session;

pub use domain::config::{AdminConfig, ConfigError, GatewayConfig, HandshakeConfig, HttpConfig};
pub use domain::error::{ApiError, GatewayError};
pub use service::{build_router, sweep_task, AppState, SsoGatewayService};
