//! A [`Renderer`] that presents everything through `tracing`.
//!
//! The console has no widgets; the operator reads the log.  Redraw requests
//! from the core are full-state, so this renderer remembers what it last
//! showed and only logs what changed.

use guardian_core::domain::alert::{duration_to_millis, TtlPolicy};
use guardian_core::domain::backend::{AgentStatus, AgentSummary, Incident};
use guardian_core::domain::event_log::Entries;
use guardian_core::domain::status::MonitoringStatus;
use guardian_core::{Alert, AlertId, ConnectionState, EventLevel, Millis, Renderer, StatsSnapshot};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
pub struct TracingRenderer {
    last_connection: Option<(ConnectionState, u32)>,
    /// Timestamp and message of the newest event-log entry already shown.
    last_event: Option<(Millis, String)>,
    last_monitoring: Option<MonitoringStatus>,
    last_agents: Option<AgentSummary>,
    shown_incidents: usize,
    alerts_shown: u64,
}

impl TracingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts presented so far.
    pub fn alerts_shown(&self) -> u64 {
        self.alerts_shown
    }

    pub fn last_connection(&self) -> Option<(ConnectionState, u32)> {
        self.last_connection
    }
}

impl Renderer for TracingRenderer {
    fn render_alert(&mut self, alert: &Alert) {
        self.alerts_shown += 1;
        let ttl_ms = duration_to_millis(alert.ttl);
        match alert.kind.ttl_policy() {
            TtlPolicy::Standard => {
                warn!(alert = %alert.id, kind = ?alert.kind, ttl_ms, data = %alert.data, "ALERT {}", alert.title)
            }
            TtlPolicy::Toast => {
                info!(alert = %alert.id, kind = ?alert.kind, ttl_ms, "{}", alert.title)
            }
        }
    }

    fn remove_alert(&mut self, id: AlertId) {
        debug!(alert = %id, "alert removed");
    }

    fn update_chart(&mut self, series: &str, data: &StatsSnapshot) {
        let values = data
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(series, "stats: {values}");
    }

    fn render_event_log(&mut self, mut entries: Entries<'_>) {
        let Some(newest) = entries.next() else {
            return;
        };
        let key = (newest.timestamp, newest.message.clone());
        if self.last_event.as_ref() == Some(&key) {
            return;
        }
        self.last_event = Some(key);

        let event_type = newest.event_type.as_str();
        match newest.level {
            EventLevel::Critical | EventLevel::Error => {
                error!(event_type, level = %newest.level, "{}", newest.message)
            }
            EventLevel::Warning => warn!(event_type, "{}", newest.message),
            EventLevel::Info => info!(event_type, "{}", newest.message),
        }
    }

    fn render_connection(&mut self, state: ConnectionState, reconnect_attempts: u32) {
        let current = (state, reconnect_attempts);
        if self.last_connection == Some(current) {
            return;
        }
        self.last_connection = Some(current);

        match state {
            ConnectionState::Failed => {
                error!("connection failed after {reconnect_attempts} reconnect attempts; type `reset`")
            }
            ConnectionState::Reconnecting => {
                warn!("connection lost, reconnect attempt {reconnect_attempts}")
            }
            ConnectionState::Disconnected => warn!("disconnected"),
            other => info!("connection {other}"),
        }
    }

    fn render_monitoring(&mut self, status: &MonitoringStatus) {
        if self.last_monitoring.as_ref() == Some(status) {
            return;
        }
        info!(
            agent = status.agent_id.as_deref().unwrap_or("-"),
            active = ?status.active,
            directory = status.monitor_directory.as_deref().unwrap_or("-"),
            "agent status {}",
            status.agent_status.as_deref().unwrap_or("unknown"),
        );
        self.last_monitoring = Some(status.clone());
    }

    fn render_agents(&mut self, agents: &[AgentStatus], summary: &AgentSummary) {
        if self.last_agents.as_ref() == Some(summary) {
            return;
        }
        self.last_agents = Some(*summary);
        info!(
            total = agents.len(),
            online = summary.online,
            offline = summary.offline,
            quarantined = summary.quarantined,
            "agents"
        );
    }

    fn render_incidents(&mut self, incidents: &[Incident]) {
        if incidents.len() == self.shown_incidents {
            return;
        }
        self.shown_incidents = incidents.len();
        for incident in incidents {
            info!(
                incident = %incident.incident_id,
                agent = %incident.agent_id,
                level = incident.threat_level.as_deref().unwrap_or("unknown"),
                status = incident.status.as_deref().unwrap_or("-"),
                "incident"
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_core::{AlertKind, EventLog, EventLogEntry};
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn test_connection_changes_are_tracked() {
        // Arrange
        let mut renderer = TracingRenderer::new();

        // Act
        renderer.render_connection(ConnectionState::Connecting, 0);
        renderer.render_connection(ConnectionState::Reconnecting, 2);

        // Assert
        assert_eq!(
            renderer.last_connection(),
            Some((ConnectionState::Reconnecting, 2))
        );
    }

    #[test]
    fn test_render_alert_counts_every_alert() {
        let mut renderer = TracingRenderer::new();
        let alert = Alert {
            id: AlertId::new(1),
            kind: AlertKind::Threat,
            title: "Threat detected".to_string(),
            data: Value::Null,
            created_at: 0,
            ttl: Duration::from_secs(10),
        };
        renderer.render_alert(&alert);
        renderer.render_alert(&alert);
        assert_eq!(renderer.alerts_shown(), 2);
    }

    #[test]
    fn test_event_log_redraw_only_tracks_new_head() {
        // Arrange
        let mut renderer = TracingRenderer::new();
        let mut log = EventLog::new();
        log.append(EventLogEntry::new("ERROR", "first", EventLevel::Error, 1));

        // Act
        renderer.render_event_log(log.entries());
        renderer.render_event_log(log.entries());
        log.append(EventLogEntry::new("ERROR", "second", EventLevel::Error, 2));
        renderer.render_event_log(log.entries());

        // Assert
        assert_eq!(renderer.last_event, Some((2, "second".to_string())));
    }

    #[test]
    fn test_empty_event_log_is_ignored() {
        let mut renderer = TracingRenderer::new();
        renderer.render_event_log(EventLog::new().entries());
        assert!(renderer.last_event.is_none());
    }
}
