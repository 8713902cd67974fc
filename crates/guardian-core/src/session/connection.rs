//! Connection lifecycle and reconnection policy.
//!
//! # State machine
//!
//! ```text
//!   Idle ──open()──▶ Connecting ──on_open()──▶ Connected
//!                      │                          │
//!          close/error │                          │ close/error
//!                      ▼                          │
//!                   Disconnected ◀────────────────┘
//!                      │
//!                      ├── attempts < max ──▶ Reconnecting (timer armed)
//!                      └── attempts == max ─▶ Failed
//!
//!   Reconnecting ──retry timer──▶ Connecting
//!   any state ──close()──▶ Idle
//! ```
//!
//! `Disconnected` is transient: the manager decides between `Reconnecting`
//! and `Failed` in the same call that observed the loss.  `reconnect_attempts`
//! is incremented when the retry is scheduled, before it fires, and resets to
//! zero on every successful open.  `Failed` is terminal: only an explicit
//! `close()` returns it to `Idle`, from where `open()` starts over.
//!
//! # Generations
//!
//! Every call to `open()` starts a new [`ConnectionId`].  Transport events
//! and reconnect timers carry the id they belong to; anything carrying an id
//! other than the current one is stale and ignored.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::session::ports::{Transport, TransportError};
use crate::session::scheduler::{Scheduler, TimerHandle, TimerTask};

/// Reconnect attempts before the connection is declared failed.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed delay between a lost connection and the next attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3_000);

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Identifies one connection attempt (a generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Fixed-delay reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Result of feeding an event to the [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event was stale or did not apply in the current state.
    Unchanged,
    Connecting,
    Connected,
    /// The connection was lost and retry number `attempt` is scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// The connection was lost with no attempts left.
    Failed,
    /// Closed on request; the manager is back in `Idle`.
    Closed,
}

/// Owns the [`Transport`] and drives the connection state machine.
pub struct ConnectionManager<T> {
    transport: T,
    policy: ReconnectPolicy,
    state: ConnectionState,
    reconnect_attempts: u32,
    generation: u64,
    reconnect_timer: Option<TimerHandle>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            state: ConnectionState::Idle,
            reconnect_attempts: 0,
            generation: 0,
            reconnect_timer: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// The id of the most recent connection attempt.
    pub fn current(&self) -> ConnectionId {
        ConnectionId(self.generation)
    }

    /// Whether `connection` is the live generation.
    pub fn is_current(&self, connection: ConnectionId) -> bool {
        connection.0 == self.generation
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Starts a new connection attempt.
    ///
    /// Ignored while already connecting or connected, and while `Failed`
    /// (use [`reset`](Self::reset)).  A transport that fails synchronously is
    /// handled exactly like one that closes right away.
    pub fn open(&mut self, scheduler: &mut dyn Scheduler) -> Transition {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(state = %self.state, "open ignored: connection already active");
                return Transition::Unchanged;
            }
            ConnectionState::Failed => {
                warn!("open ignored: connection failed, reset required");
                return Transition::Unchanged;
            }
            ConnectionState::Idle
            | ConnectionState::Disconnected
            | ConnectionState::Reconnecting => {}
        }

        self.cancel_reconnect_timer(scheduler);
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        let connection = self.current();
        info!(%connection, attempt = self.reconnect_attempts, "connecting");

        match self.transport.open(connection) {
            Ok(()) => Transition::Connecting,
            Err(e) => {
                warn!(%connection, "transport open failed: {e}");
                self.connection_lost(scheduler)
            }
        }
    }

    /// The transport finished opening `connection`.
    pub fn on_open(&mut self, connection: ConnectionId) -> Transition {
        if !self.is_current(connection) || self.state != ConnectionState::Connecting {
            debug!(%connection, state = %self.state, "ignoring stale open");
            return Transition::Unchanged;
        }
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        info!(%connection, "connected");
        Transition::Connected
    }

    /// The transport reported that `connection` closed.
    pub fn on_closed(&mut self, connection: ConnectionId, scheduler: &mut dyn Scheduler) -> Transition {
        if !self.is_live(connection) {
            debug!(%connection, state = %self.state, "ignoring stale close");
            return Transition::Unchanged;
        }
        info!(%connection, "connection closed");
        self.connection_lost(scheduler)
    }

    /// The transport reported an error on `connection`.
    ///
    /// Errors are not surfaced to callers; they end the stream the same way a
    /// close does.
    pub fn on_error(
        &mut self,
        connection: ConnectionId,
        error: &TransportError,
        scheduler: &mut dyn Scheduler,
    ) -> Transition {
        if !self.is_live(connection) {
            debug!(%connection, "ignoring stale transport error: {error}");
            return Transition::Unchanged;
        }
        warn!(%connection, "transport error: {error}");
        self.transport.close();
        self.connection_lost(scheduler)
    }

    /// The reconnect timer armed for `connection` fired.
    pub fn on_reconnect_timer(
        &mut self,
        handle: TimerHandle,
        connection: ConnectionId,
        scheduler: &mut dyn Scheduler,
    ) -> Transition {
        if self.reconnect_timer != Some(handle)
            || !self.is_current(connection)
            || self.state != ConnectionState::Reconnecting
        {
            debug!(%connection, "ignoring stale reconnect timer");
            return Transition::Unchanged;
        }
        self.reconnect_timer = None;
        self.open(scheduler)
    }

    /// Closes the connection on request.
    ///
    /// Cancels the pending reconnect timer, invalidates the current
    /// generation, and returns to `Idle` with zero attempts.
    pub fn close(&mut self, scheduler: &mut dyn Scheduler) -> Transition {
        self.cancel_reconnect_timer(scheduler);
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.transport.close();
        }
        let was = self.state;
        self.generation += 1;
        self.state = ConnectionState::Idle;
        self.reconnect_attempts = 0;
        info!(from = %was, "connection closed on request");
        Transition::Closed
    }

    /// Events are only meaningful for the current generation while a stream
    /// is open or opening.
    fn is_live(&self, connection: ConnectionId) -> bool {
        self.is_current(connection)
            && matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Connected
            )
    }

    fn connection_lost(&mut self, scheduler: &mut dyn Scheduler) -> Transition {
        self.state = ConnectionState::Disconnected;

        if self.reconnect_attempts >= self.policy.max_attempts {
            self.state = ConnectionState::Failed;
            warn!(
                attempts = self.reconnect_attempts,
                "reconnect attempts exhausted, connection failed"
            );
            return Transition::Failed;
        }

        self.reconnect_attempts += 1;
        self.state = ConnectionState::Reconnecting;
        let delay = self.policy.retry_delay;
        let handle = scheduler.schedule(
            delay,
            TimerTask::Reconnect {
                connection: self.current(),
            },
        );
        self.reconnect_timer = Some(handle);
        info!(
            attempt = self.reconnect_attempts,
            max = self.policy.max_attempts,
            "reconnecting in {}ms",
            delay.as_millis()
        );
        Transition::Reconnecting {
            attempt: self.reconnect_attempts,
            delay,
        }
    }

    fn cancel_reconnect_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.reconnect_timer.take() {
            scheduler.cancel(handle);
        }
    }
}

impl<T> fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("generation", &self.generation)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
