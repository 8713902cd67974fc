//! Ports: the capabilities the session needs from the outside world.
//!
//! `guardian-console` implements them with a WebSocket client and a
//! tracing-based renderer; tests use the recording doubles in
//! [`mock`](crate::session::mock).

use thiserror::Error;

use crate::domain::alert::{Alert, AlertId};
use crate::domain::backend::{AgentStatus, AgentSummary, Incident};
use crate::domain::event_log::Entries;
use crate::domain::stats::StatsSnapshot;
use crate::domain::status::MonitoringStatus;
use crate::session::connection::{ConnectionId, ConnectionState};

/// Errors reported by a [`Transport`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("transport is closed")]
    Closed,
}

/// A duplex message stream to the agent.
///
/// `open` only *starts* a connection.  The driver reports what happens next
/// (open, frame, close, error) back to the session, tagged with the
/// [`ConnectionId`] passed here so events from an older stream can be told
/// apart.
pub trait Transport {
    /// Starts connecting.  An `Err` means the attempt failed immediately.
    fn open(&mut self, connection: ConnectionId) -> Result<(), TransportError>;

    /// Sends one text frame on the current stream.
    fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Tears down the current stream, if any.  Must be idempotent.
    fn close(&mut self);
}

/// Presentation capability.  Invoked by the core, implemented outside it.
pub trait Renderer {
    fn render_alert(&mut self, alert: &Alert);

    fn remove_alert(&mut self, id: AlertId);

    /// Redraws chart `series` from the current stats view.
    fn update_chart(&mut self, series: &str, data: &StatsSnapshot);

    /// Redraws the event log, newest entry first.
    fn render_event_log(&mut self, entries: Entries<'_>);

    fn render_connection(&mut self, state: ConnectionState, reconnect_attempts: u32);

    fn render_monitoring(&mut self, _status: &MonitoringStatus) {}

    fn render_agents(&mut self, _agents: &[AgentStatus], _summary: &AgentSummary) {}

    fn render_incidents(&mut self, _incidents: &[Incident]) {}
}
