//! Requests to and replies from the backend REST collaborator.
//!
//! The session never performs HTTP itself.  It queues [`BackendRequest`]s,
//! the driver executes them, and the outcome comes back as a
//! `Result<BackendReply, BackendError>`.  Only the named JSON fields below are
//! read; everything else in a response is ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::stats::StatsSnapshot;

/// Threat type used when the operator simulates without naming one.
pub const DEFAULT_SIMULATED_THREAT: &str = "DEMO_SUPERVISED_DETECTION";

/// `GET /dashboard/overview`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub topology: Topology,
    #[serde(default)]
    pub active_incidents: ActiveIncidents,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub total_agents: i64,
    #[serde(default)]
    pub online_agents: i64,
    #[serde(default)]
    pub connected_agents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActiveIncidents {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub critical: i64,
    #[serde(default)]
    pub emergencies: i64,
}

impl StatsSummary {
    /// The counters this summary contributes to the rolling stats view.
    pub fn to_snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::new()
            .with("online_agents", self.topology.online_agents)
            .with("total_agents", self.topology.total_agents)
            .with("critical_incidents", self.active_incidents.critical)
            .with("total_incidents", self.active_incidents.total)
            .with("emergencies", self.active_incidents.emergencies)
    }
}

/// One row of `GET /incidents`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub incident_id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub threat_level: Option<String>,
    #[serde(default)]
    pub malware_process: Option<String>,
    #[serde(default)]
    pub detection_confidence: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncidentList {
    #[serde(default)]
    pub incidents: Vec<Incident>,
}

/// One row of `GET /agents`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentList {
    #[serde(default)]
    pub agents: Vec<AgentStatus>,
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub connected_count: Option<i64>,
}

/// Online/offline/quarantined split derived from an agent list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentSummary {
    pub online: i64,
    pub offline: i64,
    pub quarantined: i64,
}

impl AgentSummary {
    /// Counts agents by status.  `quarantined` and `isolated` count as
    /// quarantined, `online` as online, anything else as offline.
    pub fn from_agents(agents: &[AgentStatus]) -> Self {
        agents.iter().fold(Self::default(), |mut acc, agent| {
            match agent.status.to_ascii_lowercase().as_str() {
                "online" => acc.online += 1,
                "quarantined" | "isolated" => acc.quarantined += 1,
                _ => acc.offline += 1,
            }
            acc
        })
    }

    pub fn to_snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::new()
            .with("agents_online", self.online)
            .with("agents_offline", self.offline)
            .with("agents_quarantined", self.quarantined)
    }
}

/// Body of `POST /configure`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryConfig {
    pub monitor_directory: String,
    pub backup_directory: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub important_folders: Vec<String>,
}

/// Body of `POST /simulate-threat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatSimulation {
    pub threat_type: String,
    pub threat_level: String,
    pub confidence: f64,
}

impl Default for ThreatSimulation {
    fn default() -> Self {
        Self {
            threat_type: DEFAULT_SIMULATED_THREAT.to_string(),
            threat_level: "critical".to_string(),
            confidence: 0.95,
        }
    }
}

/// Generic acknowledgement returned by the action endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ActionAck {
    /// Text for the operator toast.
    pub fn summary(&self) -> &str {
        self.message
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("ok")
    }
}

/// A request the session wants executed against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    StatsSummary,
    Agents,
    RecentIncidents { hours: u32, limit: u32 },
    Configure(DirectoryConfig),
    StartMonitoring,
    SimulateThreat(ThreatSimulation),
}

impl BackendRequest {
    /// Whether this request was issued by a polling timer rather than the operator.
    pub fn is_poll(&self) -> bool {
        matches!(
            self,
            BackendRequest::StatsSummary
                | BackendRequest::Agents
                | BackendRequest::RecentIncidents { .. }
        )
    }
}

impl fmt::Display for BackendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendRequest::StatsSummary => f.write_str("stats summary"),
            BackendRequest::Agents => f.write_str("agent list"),
            BackendRequest::RecentIncidents { hours, limit } => {
                write!(f, "recent incidents ({limit} in {hours}h)")
            }
            BackendRequest::Configure(_) => f.write_str("configure directories"),
            BackendRequest::StartMonitoring => f.write_str("start monitoring"),
            BackendRequest::SimulateThreat(_) => f.write_str("simulate threat"),
        }
    }
}

/// A successful backend response.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    StatsSummary(StatsSummary),
    Agents(AgentList),
    Incidents(IncidentList),
    Ack(ActionAck),
}

/// Why a backend request failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never got a response (connect error, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}")]
    Status { status: u16 },

    /// The response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
