//! Process-wide connection cache
//!
//! A [`ConnectionSlot`] owns at most one live client handle for one external
//! dependency. Every caller goes through [`ConnectionSlot::get_or_create`]
//! before a unit of work; the slot either returns the cached handle after a
//! successful probe, or builds, probes and publishes a new one.
//!
//! ```text
//! Empty ──open──> Creating ──probe ok──> Ready
//!   ^                 │                    │
//!   └──── failure ────┘<── probe failed ───┘  (then one recreation attempt)
//! ```
//!
//! The guard is held across `open`, `probe` and `close`. All three run under a
//! fixed deadline so one unresponsive dependency cannot starve the other callers.

use std::env;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::ConnectionError;

/// Opens, probes and releases handles for one kind of external dependency
pub trait Connector: Send + Sync {
    /// Handle handed to callers; clones must refer to the same connection
    type Handle: Clone + Send + Sync;

    /// Human-readable store name used in errors and logs
    fn name(&self) -> &'static str;

    /// Open a new connection to `target`
    fn open(
        &self,
        target: &str,
    ) -> impl Future<Output = Result<Self::Handle, ConnectionError>> + Send;

    /// Lightweight liveness check against an existing handle
    fn probe(
        &self,
        handle: &Self::Handle,
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Release a handle that is no longer trusted
    fn close(&self, handle: Self::Handle) -> impl Future<Output = ()> + Send;
}

/// Where a slot reads its connection target from
///
/// Resolved on every creation attempt, so a corrected environment value takes
/// effect on the next call that finds the slot empty.
#[derive(Debug, Clone)]
pub enum TargetSource {
    Env(String),
    #[cfg(test)]
    Fixed(String),
}

impl TargetSource {
    pub fn env(var: impl Into<String>) -> Self {
        TargetSource::Env(var.into())
    }

    fn resolve(&self) -> Option<String> {
        let value = match self {
            TargetSource::Env(var) => env::var(var).ok()?,
            #[cfg(test)]
            TargetSource::Fixed(value) => value.clone(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn describe(&self) -> String {
        match self {
            TargetSource::Env(var) => format!("{} environment variable", var),
            #[cfg(test)]
            TargetSource::Fixed(_) => "connection target".to_string(),
        }
    }
}

/// Deadlines applied to `open` and `probe`; `close` shares the probe deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            probe: Duration::from_secs(5),
        }
    }
}

/// Observable lifecycle of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Empty,
    Creating,
    Ready,
}

enum Phase<H> {
    Empty,
    Creating,
    Ready(H),
}

struct SlotState<H> {
    phase: Phase<H>,
    last_error: Option<ConnectionError>,
}

/// Cache entry owning the lifecycle of one handle
pub struct ConnectionSlot<C: Connector> {
    connector: C,
    target: TargetSource,
    timeouts: Timeouts,
    state: Mutex<SlotState<C::Handle>>,
}

impl<C: Connector> ConnectionSlot<C> {
    pub fn new(connector: C, target: TargetSource, timeouts: Timeouts) -> Self {
        Self {
            connector,
            target,
            timeouts,
            state: Mutex::new(SlotState {
                phase: Phase::Empty,
                last_error: None,
            }),
        }
    }

    #[cfg(test)]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub async fn phase(&self) -> SlotPhase {
        match self.state.lock().await.phase {
            Phase::Empty => SlotPhase::Empty,
            Phase::Creating => SlotPhase::Creating,
            Phase::Ready(_) => SlotPhase::Ready,
        }
    }

    /// Error from the most recent failed attempt, cleared on success
    pub async fn last_error(&self) -> Option<ConnectionError> {
        self.state.lock().await.last_error.clone()
    }

    /// Return a healthy handle, creating one if needed
    ///
    /// A cached handle is probed first; if the probe fails it is closed and a
    /// single recreation is attempted within the same call. Any failure leaves
    /// the slot empty so the next call starts from scratch.
    pub async fn get_or_create(&self) -> Result<C::Handle, ConnectionError> {
        let mut state = self.state.lock().await;
        let store = self.connector.name();

        let cached = match &state.phase {
            Phase::Ready(handle) => Some(handle.clone()),
            _ => None,
        };

        if let Some(handle) = cached {
            match self.probe(&handle).await {
                Ok(()) => {
                    debug!(store, "Reusing cached connection");
                    return Ok(handle);
                }
                Err(err) => {
                    warn!(store, error = %err, "Cached connection failed health check, recreating");
                    state.phase = Phase::Empty;
                    self.release(handle).await;
                }
            }
        }

        let Some(target) = self.target.resolve() else {
            let err = ConnectionError::ConfigurationMissing(self.target.describe());
            state.last_error = Some(err.clone());
            return Err(err);
        };

        state.phase = Phase::Creating;

        let handle = match self.open(&target).await {
            Ok(handle) => handle,
            Err(err) => return Err(Self::reset(&mut state, store, err)),
        };

        if let Err(err) = self.probe(&handle).await {
            self.release(handle).await;
            return Err(Self::reset(&mut state, store, err));
        }

        info!(store, "Connection established");
        state.phase = Phase::Ready(handle.clone());
        state.last_error = None;
        Ok(handle)
    }

    async fn open(&self, target: &str) -> Result<C::Handle, ConnectionError> {
        let limit = self.timeouts.connect;
        match timeout(limit, self.connector.open(target)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::ConnectionFailed {
                store: self.connector.name(),
                reason: format!("timed out after {:?}", limit),
            }),
        }
    }

    async fn probe(&self, handle: &C::Handle) -> Result<(), ConnectionError> {
        let limit = self.timeouts.probe;
        match timeout(limit, self.connector.probe(handle)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::HealthCheckFailed {
                store: self.connector.name(),
                reason: format!("timed out after {:?}", limit),
            }),
        }
    }

    // A close that outlives the deadline is abandoned; the handle is dropped with it
    async fn release(&self, handle: C::Handle) {
        let limit = self.timeouts.probe;
        if timeout(limit, self.connector.close(handle)).await.is_err() {
            warn!(
                store = self.connector.name(),
                "Closing connection timed out after {:?}, dropping it", limit
            );
        }
    }

    fn reset(
        state: &mut SlotState<C::Handle>,
        store: &'static str,
        err: ConnectionError,
    ) -> ConnectionError {
        warn!(
            store,
            error = %err,
            retryable = err.is_retryable(),
            "Connection attempt failed, slot reset"
        );
        state.phase = Phase::Empty;
        state.last_error = Some(err.clone());
        err
    }
}
