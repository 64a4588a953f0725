//! Admin API: read-only HTTP introspection of a running relay.
//!
//! # Routes
//! - `GET /status` → [`crate::relay::Status`]
//! - `GET /config` → the live [`crate::config::RelayConfig`] snapshot
//! - `GET /metrics` → Prometheus exposition, on `admin.metrics_endpoint`
//!
//! # Design Decisions
//! - Each server has its own stop channel; [`AdminServers::apply`] stops and
//!   rebinds only the servers whose configured address changed
//! - A server that fails to bind is logged and retried on the next apply

pub mod handlers;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use self::handlers::{get_config, get_metrics, get_status};
use crate::config::AdminConfig;
use crate::relay::Relay;

/// Build the admin router over a shared relay.
pub fn setup_admin_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/config", get(get_config))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// Build the Prometheus scrape router.
pub fn setup_metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .with_state(handle)
}

/// One running HTTP server.
struct Server {
    name: &'static str,
    configured: String,
    local_addr: SocketAddr,
    stop: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl Server {
    async fn spawn(name: &'static str, configured: &str, router: Router) -> io::Result<Self> {
        let addr: SocketAddr = configured
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (stop, mut rx) = broadcast::channel(1);
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(server = name, error = %e, "Server failed");
            }
        });

        tracing::info!(server = name, address = %local_addr, "Server listening");
        Ok(Self {
            name,
            configured: configured.to_string(),
            local_addr,
            stop,
            task,
        })
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(server = self.name, error = %e, "Server task ended abnormally");
        }
        tracing::info!(server = self.name, address = %self.local_addr, "Server stopped");
    }
}

/// The admin API and the metrics endpoint of one relay.
pub struct AdminServers {
    relay: Arc<Relay>,
    metrics: Option<PrometheusHandle>,
    api: Option<Server>,
    exporter: Option<Server>,
}

impl AdminServers {
    pub fn new(relay: Arc<Relay>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            relay,
            metrics,
            api: None,
            exporter: None,
        }
    }

    /// Bring both servers in line with `config`. Completes the restart cycle
    /// of an admin reconciliation that moved either address.
    pub async fn apply(&mut self, config: &AdminConfig) {
        let relay = self.relay.clone();
        converge(&mut self.api, "admin API", config.address.as_deref(), || {
            setup_admin_router(relay)
        })
        .await;

        match &self.metrics {
            Some(handle) => {
                let handle = handle.clone();
                converge(
                    &mut self.exporter,
                    "metrics",
                    config.metrics_endpoint.as_deref(),
                    || setup_metrics_router(handle),
                )
                .await;
            }
            None if config.metrics_endpoint.is_some() => {
                tracing::warn!("metrics endpoint configured but no recorder installed");
            }
            None => {}
        }
    }

    /// Bound address of the admin API.
    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api.as_ref().map(|s| s.local_addr)
    }

    /// Bound address of the metrics endpoint.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.exporter.as_ref().map(|s| s.local_addr)
    }

    /// Stop both servers, waiting for in-flight requests.
    pub async fn shutdown(&mut self) {
        for server in [self.api.take(), self.exporter.take()].into_iter().flatten() {
            server.stop().await;
        }
    }
}

async fn converge(
    slot: &mut Option<Server>,
    name: &'static str,
    wanted: Option<&str>,
    router: impl FnOnce() -> Router,
) {
    if slot.as_ref().map(|s| s.configured.as_str()) == wanted {
        return;
    }
    if let Some(old) = slot.take() {
        old.stop().await;
    }
    if let Some(addr) = wanted {
        match Server::spawn(name, addr, router()).await {
            Ok(server) => *slot = Some(server),
            Err(e) => tracing::error!(server = name, address = addr, error = %e, "Failed to start server"),
        }
    }
}
