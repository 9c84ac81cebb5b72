//! Service startup and graceful shutdown.
//!
//! [`start`] walks the lifecycle from `Starting` to `Serving`: open the
//! store, ping it, ensure the schema, bind the listener. Any failure on the
//! way is fatal and nothing is served. [`RunningServer::shutdown_on`] then
//! waits for the shutdown signal and drains.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::config::{Config, DEFAULT_PORT};
use crate::error::{Result, ServiceError};
use crate::lifecycle::{drain, DrainOutcome, InFlight, Lifecycle, LifecycleState, DRAIN_TIMEOUT};
use crate::store::{self, SharedStore};

/// Open, verify and prepare the store named by the configuration.
///
/// Advances `lifecycle` through `Connecting` and `Verifying`; on failure it
/// is moved to `Stopped`.
pub async fn open_store(config: &Config, lifecycle: &Lifecycle) -> Result<SharedStore> {
    lifecycle.advance(LifecycleState::Connecting);
    info!(dsn = %config.redacted_dsn(), "Connecting to database");
    let store = store::connect(&config.database_dsn, config.connect_timeout())
        .await
        .map_err(|e| fatal(lifecycle, "Database connection failed", e.into()))?;

    lifecycle.advance(LifecycleState::Verifying);
    store
        .ping()
        .await
        .map_err(|e| fatal(lifecycle, "Database ping failed", e.into()))?;
    info!("Database connection OK");

    store
        .ensure_schema()
        .await
        .map_err(|e| fatal(lifecycle, "Schema setup failed", e.into()))?;

    Ok(store)
}

fn fatal(lifecycle: &Lifecycle, what: &str, err: ServiceError) -> ServiceError {
    error!(error = %err, "{}", what);
    lifecycle.advance(LifecycleState::Stopped);
    err
}

/// Bring the service up to `Serving`.
pub async fn start(config: &Config, metrics: Option<PrometheusHandle>) -> Result<RunningServer> {
    let lifecycle = Lifecycle::new();
    let store = open_store(config, &lifecycle).await?;

    let mut state = AppState::new(store);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    serve(config, state, lifecycle).await
}

/// Bind the listener and start serving `state` with an already verified
/// store. `lifecycle` must be in `Verifying`.
pub async fn serve(config: &Config, state: AppState, lifecycle: Lifecycle) -> Result<RunningServer> {
    if config.port_defaulted() {
        info!("PORT not set, using default :{}", DEFAULT_PORT);
    }

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| fatal(&lifecycle, "Failed to bind listener", e.into()))?;
    let local_addr = listener.local_addr()?;

    let in_flight = state.in_flight.clone();
    let router = create_router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        })
        .await
    });

    lifecycle.advance(LifecycleState::Serving);
    info!("Server starting on {}", local_addr);

    Ok(RunningServer {
        local_addr,
        lifecycle,
        in_flight,
        server,
        shutdown_tx,
        drain_timeout: DRAIN_TIMEOUT,
    })
}

/// A server in the `Serving` state.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    lifecycle: Lifecycle,
    in_flight: InFlight,
    server: JoinHandle<io::Result<()>>,
    shutdown_tx: oneshot::Sender<()>,
    drain_timeout: Duration,
}

impl RunningServer {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Lifecycle of this server.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// In-flight request counter.
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Override the drain timeout (defaults to [`DRAIN_TIMEOUT`]).
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Serve until `signal` resolves, then stop accepting and drain.
    ///
    /// Returns an error if the listener fails on its own before any signal.
    pub async fn shutdown_on<F>(mut self, signal: F) -> Result<DrainOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = &mut self.server => {
                self.lifecycle.advance(LifecycleState::Stopped);
                let err = match result {
                    Ok(Ok(())) => io::Error::other("listener stopped unexpectedly"),
                    Ok(Err(e)) => e,
                    Err(join_error) => io::Error::other(join_error),
                };
                error!(error = %err, "Server failed");
                return Err(err.into());
            }
            _ = signal => {}
        }

        self.lifecycle.advance(LifecycleState::Draining);
        info!(
            in_flight = self.in_flight.current(),
            "Shutting down server gracefully..."
        );
        // The receiver only disappears if the server task already ended.
        let _ = self.shutdown_tx.send(());

        let outcome = drain(&mut self.server, &self.in_flight, self.drain_timeout).await;
        self.lifecycle.advance(LifecycleState::Stopped);

        match outcome {
            Ok(outcome) => {
                info!(?outcome, "Server stopped");
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "HTTP server shutdown failed");
                Err(e.into())
            }
        }
    }
}
