//! # Discourse SSO Server
//!
//! Runs the SSO provider as a standalone service.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load gateway configuration from the environment
//! 3. Seed settings (`DISCOURSE_SSO_SECRET`, `DISCOURSE_SSO_REQUIRE_ACTIVATION`)
//! 4. Load sessions from `SSO_SESSIONS_FILE`, if set
//! 5. Serve until Ctrl+C, then shut down gracefully

mod bootstrap;

use anyhow::{Context, Result};
use sso_core::{SessionProvider, SettingsStore};
use sso_gateway::{GatewayConfig, SsoGatewayService};
use sso_telemetry::{init_telemetry, TelemetryConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Discourse SSO Provider v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;

    let settings: Arc<dyn SettingsStore> =
        Arc::new(bootstrap::seed_settings(|key| std::env::var(key).ok())?);
    let sessions_file = std::env::var_os("SSO_SESSIONS_FILE").map(PathBuf::from);
    let sessions: Arc<dyn SessionProvider> =
        Arc::new(bootstrap::load_sessions(sessions_file.as_deref())?);

    let mut gateway = SsoGatewayService::new(config, settings, sessions)
        .context("failed to create gateway")?;
    gateway.start().await.context("failed to start gateway")?;

    info!("SSO provider is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    gateway.shutdown().await;
    Ok(())
}
