//! SSO gateway service - router, server lifecycle and background sweep.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::handlers::{health, settings, sso};
use crate::middleware::{AdminAuthLayer, RequestTracingLayer};
use axum::{routing::get, Router};
use sso_core::{HandshakeService, ReplayGuard, SessionProvider, SettingsStore};
use sso_telemetry::{REPLAY_GUARD_EVICTED, REPLAY_GUARD_SWEEPS};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info};

/// Handshake service over trait-object stores.
pub type DynHandshakeService = HandshakeService<dyn SettingsStore, dyn SessionProvider>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub handshake: Arc<DynHandshakeService>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Wires a handshake service from the stores and configuration.
    pub fn new(
        config: GatewayConfig,
        settings: Arc<dyn SettingsStore>,
        sessions: Arc<dyn SessionProvider>,
        replay: Arc<ReplayGuard>,
    ) -> Self {
        let handshake = HandshakeService::new(settings, sessions)
            .with_replay_guard(replay)
            .with_nonce_ttl(config.handshake.nonce_ttl);

        Self {
            handshake: Arc::new(handshake),
            config: Arc::new(config),
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    let admin_auth = AdminAuthLayer::new(
        state.config.admin.api_key.clone(),
        Arc::clone(state.handshake.sessions()),
    );

    let settings_routes = Router::new()
        .route(
            "/api/v1/system/setting",
            get(settings::get_setting)
                .put(settings::put_setting)
                .delete(settings::delete_setting),
        )
        .route_layer(admin_auth);

    let middleware = ServiceBuilder::new()
        .layer(RequestTracingLayer::new())
        .layer(TimeoutLayer::new(state.config.http.request_timeout));

    Router::new()
        .route("/discourse_sso", get(sso::sso_redirect))
        .route("/api/v1/discourse_sso", get(sso::sso_return_url))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .merge(settings_routes)
        .layer(middleware)
        .with_state(state)
}

/// Periodically sweeps expired nonces until `shutdown` flips.
pub async fn sweep_task(
    guard: Arc<ReplayGuard>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                let removed = guard.sweep(Instant::now());
                REPLAY_GUARD_SWEEPS.inc();
                REPLAY_GUARD_EVICTED.inc_by(removed as f64);
                if removed > 0 {
                    debug!(removed = removed, "Swept expired nonces");
                }
            }
            _ = shutdown.changed() => {
                debug!("Replay guard sweep task stopping");
                break;
            }
        }
    }
}

/// SSO gateway service state
pub struct SsoGatewayService {
    state: AppState,
    replay: Arc<ReplayGuard>,
    shutdown_tx: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl SsoGatewayService {
    /// Create a new gateway service
    pub fn new(
        config: GatewayConfig,
        settings: Arc<dyn SettingsStore>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let replay = Arc::new(ReplayGuard::with_sweep_interval(
            config.handshake.sweep_interval,
        ));
        let state = AppState::new(config, settings, sessions, Arc::clone(&replay));

        Ok(Self {
            state,
            replay,
            shutdown_tx: None,
            tasks: Vec::new(),
            local_addr: None,
        })
    }

    /// The router served by [`SsoGatewayService::start`].
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if self.shutdown_tx.is_some() {
            return Err(GatewayError::AlreadyStarted);
        }
        info!("Starting SSO gateway...");

        let addr = self.state.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Start cleanup tasks
        self.tasks.push(tokio::spawn(sweep_task(
            Arc::clone(&self.replay),
            self.state.config.handshake.sweep_interval,
            shutdown_rx.clone(),
        )));

        let router = self.router();
        let mut server_shutdown = shutdown_rx;
        self.tasks.push(tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.changed().await;
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }));

        info!(addr = %local_addr, "SSO gateway started");
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Trigger graceful shutdown and wait for background tasks to finish
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!(error = %e, "Gateway task failed");
            }
        }
        info!("SSO gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sso_core::{InMemorySessionStore, InMemorySettingsStore};

    fn stores() -> (Arc<dyn SettingsStore>, Arc<dyn SessionProvider>) {
        (
            Arc::new(InMemorySettingsStore::new()),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GatewayConfig::default();
        config.handshake.nonce_ttl = Duration::ZERO;
        let (settings, sessions) = stores();
        assert!(matches!(
            SsoGatewayService::new(config, settings, sessions),
            Err(GatewayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_task_stops_on_shutdown() {
        let guard = Arc::new(ReplayGuard::new());
        guard
            .claim("n", Duration::from_millis(1))
            .unwrap();
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(sweep_task(Arc::clone(&guard), Duration::from_millis(5), rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(guard.is_empty());

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut config = GatewayConfig::default();
        config.http.host = "127.0.0.1".parse().unwrap();
        config.http.port = 0;
        let (settings, sessions) = stores();

        let mut gateway = SsoGatewayService::new(config, settings, sessions).unwrap();
        let addr = gateway.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(matches!(
            gateway.start().await,
            Err(GatewayError::AlreadyStarted)
        ));

        gateway.shutdown().await;
    }
}
