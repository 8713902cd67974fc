//! Recording test doubles for the session ports.
//!
//! [`MockTransport`] and [`RecordingRenderer`] replace the WebSocket client
//! and the terminal with in-memory recording, so tests can assert on exactly
//! what the session opened, sent, and drew, and in what order.
//!
//! # Usage in tests
//!
//! ```
//! use guardian_core::session::mock::{MockTransport, RecordingRenderer};
//! use guardian_core::{ConnectionState, Session, SessionConfig};
//!
//! let mut session = Session::new(
//!     MockTransport::new(),
//!     RecordingRenderer::new(),
//!     SessionConfig::default(),
//! );
//! session.init();
//! let id = session.connection_id();
//! session.on_transport_open(id);
//!
//! assert_eq!(session.state(), ConnectionState::Connected);
//! assert_eq!(session.transport().sent, vec![r#"{"type":"GET_STATUS"}"#]);
//! ```
//!
//! # Failure flags
//!
//! Set `fail_open` or `fail_send` to make the transport return errors, which
//! exercises the reconnect and command-failure paths.

use crate::domain::alert::{Alert, AlertId};
use crate::domain::backend::{AgentStatus, AgentSummary, Incident};
use crate::domain::event_log::{Entries, EventLogEntry};
use crate::domain::stats::StatsSnapshot;
use crate::domain::status::MonitoringStatus;
use crate::session::connection::{ConnectionId, ConnectionState};
use crate::session::ports::{Renderer, Transport, TransportError};

/// A transport that records calls instead of opening sockets.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Every connection id passed to `open`, in order.
    pub opened: Vec<ConnectionId>,
    /// Every frame passed to `send`.
    pub sent: Vec<String>,
    /// Number of `close` calls.
    pub close_calls: usize,
    /// When `true`, `open` returns `TransportError::Connect`.
    pub fail_open: bool,
    /// When `true`, `send` returns `TransportError::Send` and records nothing.
    pub fail_send: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MockTransport {
    fn open(&mut self, connection: ConnectionId) -> Result<(), TransportError> {
        self.opened.push(connection);
        if self.fail_open {
            return Err(TransportError::Connect("mock failure".into()));
        }
        Ok(())
    }

    fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Send("mock failure".into()));
        }
        self.sent.push(frame.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }
}

/// A renderer that records every call.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub alerts: Vec<Alert>,
    pub removed_alerts: Vec<AlertId>,
    /// `(series, view)` pairs passed to `update_chart`.
    pub charts: Vec<(String, StatsSnapshot)>,
    /// The event log as of the latest `render_event_log` call.
    pub event_log: Vec<EventLogEntry>,
    pub event_log_renders: usize,
    pub connection_states: Vec<(ConnectionState, u32)>,
    pub monitoring: Vec<MonitoringStatus>,
    pub agent_summaries: Vec<AgentSummary>,
    pub incident_renders: Vec<usize>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the states, without attempt counts.
    pub fn states(&self) -> Vec<ConnectionState> {
        self.connection_states.iter().map(|(s, _)| *s).collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render_alert(&mut self, alert: &Alert) {
        self.alerts.push(alert.clone());
    }

    fn remove_alert(&mut self, id: AlertId) {
        self.removed_alerts.push(id);
    }

    fn update_chart(&mut self, series: &str, data: &StatsSnapshot) {
        self.charts.push((series.to_string(), data.clone()));
    }

    fn render_event_log(&mut self, entries: Entries<'_>) {
        self.event_log = entries.cloned().collect();
        self.event_log_renders += 1;
    }

    fn render_connection(&mut self, state: ConnectionState, reconnect_attempts: u32) {
        self.connection_states.push((state, reconnect_attempts));
    }

    fn render_monitoring(&mut self, status: &MonitoringStatus) {
        self.monitoring.push(status.clone());
    }

    fn render_agents(&mut self, _agents: &[AgentStatus], summary: &AgentSummary) {
        self.agent_summaries.push(*summary);
    }

    fn render_incidents(&mut self, incidents: &[Incident]) {
        self.incident_renders.push(incidents.len());
    }
}
