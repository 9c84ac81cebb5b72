//! Process lifecycle: startup states, in-flight request tracking and the
//! bounded drain on shutdown.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strum::{AsRefStr, Display};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long in-flight requests get to finish once shutdown starts.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle state of the service process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    /// Configuration loaded, nothing opened yet.
    Starting,
    /// Opening the store.
    Connecting,
    /// Pinging the store and ensuring the schema.
    Verifying,
    /// Listener bound and accepting.
    Serving,
    /// No longer accepting; waiting for in-flight requests.
    Draining,
    /// Done.
    Stopped,
}

impl LifecycleState {
    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Every state may jump straight to `Stopped` (fatal startup error or
    /// listener failure).
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Starting, Connecting)
                | (Connecting, Verifying)
                | (Verifying, Serving)
                | (Serving, Draining)
                | (Draining, Stopped)
        ) || (next == Stopped && self != Stopped)
    }
}

/// Observable lifecycle state machine.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Starting` state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Starting);
        Self { state: Arc::new(tx) }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&self, next: LifecycleState) {
        let current = self.state();
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "Ignoring illegal lifecycle transition");
            return;
        }
        self.state.send_replace(next);
        info!(from = %current, to = %next, "Lifecycle transition");
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct InFlightInner {
    count: AtomicUsize,
    idle: Notify,
}

/// Counter of requests currently being handled.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    inner: Arc<InFlightInner>,
}

impl InFlight {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request until the returned guard is dropped.
    pub fn track(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Requests currently in flight.
    pub fn current(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Wait until no request is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Decrements the [`InFlight`] counter on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<InFlightInner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The server stopped and every request finished in time.
    Completed,
    /// The timeout elapsed; the server task was aborted.
    TimedOut {
        /// Requests still in flight when the server was aborted.
        abandoned: usize,
    },
}

/// Wait for an already-signalled server task to finish and for in-flight
/// requests to reach zero, giving up after `timeout`.
///
/// On timeout the server task is aborted, which closes any remaining
/// connections with their responses incomplete.
pub async fn drain(
    server: &mut JoinHandle<io::Result<()>>,
    in_flight: &InFlight,
    timeout: Duration,
) -> io::Result<DrainOutcome> {
    let waited = tokio::time::timeout(timeout, async {
        let result = (&mut *server).await;
        in_flight.wait_idle().await;
        result
    })
    .await;

    match waited {
        Ok(Ok(result)) => result.map(|()| DrainOutcome::Completed),
        Ok(Err(join_error)) => Err(io::Error::other(join_error)),
        Err(_elapsed) => {
            let abandoned = in_flight.current();
            server.abort();
            warn!(
                abandoned,
                timeout_secs = timeout.as_secs_f64(),
                "Drain timed out, abandoning in-flight requests"
            );
            Ok(DrainOutcome::TimedOut { abandoned })
        }
    }
}
