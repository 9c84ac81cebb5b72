//! Small helpers shared by the server and handlers.

use tokio::signal;
use tracing::{error, info};

/// Resolve once SIGINT (Ctrl+C) or SIGTERM is received.
///
/// A handler that fails to install is logged and ignored; the other signal
/// still triggers shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Parse the id segment of a `/hello/{id}` path.
///
/// Surrounding slashes are ignored. Returns `None` for anything that is not a
/// positive decimal integer.
pub fn parse_positive_id(raw: &str) -> Option<i64> {
    raw.trim_matches('/')
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
}
