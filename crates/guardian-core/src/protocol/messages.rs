//! Inbound event messages received from the monitoring agent.
//!
//! Every frame on the event stream is a JSON object with a `"type"` field
//! that names the event.  All other fields are payload and live in the same
//! object, for example:
//!
//! ```json
//! {"type":"THREAT_DETECTED","data":{"threat_level":"critical","confidence":0.95},
//!  "detection_stats":{"total_detections":3},"timestamp":"2024-01-15T14:05:00"}
//! ```
//!
//! The agent may add event types at any time, so the codec reads the tag
//! first and decodes a payload only for the known variants.  Every other tag
//! becomes [`InboundMessage::Unknown`], which the router counts and ignores.
//!
//! Payload structs are lenient: every field has a default, so a sparse event
//! from an older agent still decodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Millis;

/// Wire tags for every event type the console understands.
pub mod tags {
    /// A detection layer flagged a threat.
    pub const THREAT_DETECTED: &str = "THREAT_DETECTED";
    /// The agent executed its emergency response (critical threat).
    pub const EMERGENCY_RESPONSE: &str = "EMERGENCY_RESPONSE";
    /// The agent executed its high-alert response.
    pub const HIGH_ALERT_RESPONSE: &str = "HIGH_ALERT_RESPONSE";
    /// Suspicious activity switched the agent to enhanced monitoring.
    pub const ENHANCED_MONITORING: &str = "ENHANCED_MONITORING";
    /// Periodic or requested agent status.
    pub const STATUS_UPDATE: &str = "STATUS_UPDATE";
    /// Reply to `GET_STATUS`; carries the same payload as `STATUS_UPDATE`.
    pub const AGENT_STATUS: &str = "AGENT_STATUS";
    /// A console command was executed by the agent.
    pub const COMMAND_EXECUTED: &str = "COMMAND_EXECUTED";
    /// Real-time monitoring was switched on.
    pub const MONITORING_STARTED: &str = "MONITORING_STARTED";
    /// Real-time monitoring was switched off.
    pub const MONITORING_STOPPED: &str = "MONITORING_STOPPED";
    /// The agent rejected a command or hit an internal error.
    pub const ERROR: &str = "ERROR";
}

/// A decoded inbound frame.
///
/// Created by [`decode_frame`](crate::protocol::decode_frame), consumed once
/// by the router.  Handlers copy what they need; nothing keeps a `Message`
/// after dispatch returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The raw `"type"` tag, used as the routing key.
    pub message_type: String,
    /// The typed payload.
    pub payload: InboundMessage,
    /// Session clock reading when the frame was decoded.
    pub received_at: Millis,
}

/// Typed payload of an inbound message, one variant per known tag.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    ThreatDetected(ThreatDetected),
    EmergencyResponse(ResponseAction),
    HighAlertResponse(ResponseAction),
    EnhancedMonitoring(EnhancedMonitoring),
    StatusUpdate(StatusUpdate),
    CommandExecuted(CommandExecuted),
    MonitoringStarted(Notice),
    MonitoringStopped(Notice),
    Error(Notice),
    /// Any tag the console does not know.  The whole envelope is kept so a
    /// handler registered for the tag at runtime can still read it.
    Unknown { tag: String, payload: Value },
}

impl InboundMessage {
    /// Returns `true` for the explicit unknown-type case.
    pub fn is_unknown(&self) -> bool {
        matches!(self, InboundMessage::Unknown { .. })
    }
}

/// The detection result the agent attaches to threat-related events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_type: Option<String>,
    /// `"critical"`, `"high"`, `"medium"`, `"suspicious"`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<String>,
    /// Detection confidence in `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Which detection layer fired (`"supervised"`, `"anomaly"`, `"rules"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_detection_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malware_process: Option<String>,
    /// Layer-specific extras (files modified, entropy, ...) passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetectionResult {
    /// Threat level, or `"unknown"` when the agent omitted it.
    pub fn level(&self) -> &str {
        self.threat_level.as_deref().unwrap_or("unknown")
    }

    /// Short human-readable label: threat type, else process name, else `"unknown threat"`.
    pub fn label(&self) -> &str {
        self.threat_type
            .as_deref()
            .or(self.malware_process.as_deref())
            .unwrap_or("unknown threat")
    }
}

/// Payload of `THREAT_DETECTED`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThreatDetected {
    #[serde(default)]
    pub data: DetectionResult,
    /// Partial counter snapshot; merged into the rolling statistics.
    #[serde(default)]
    pub detection_stats: Option<Map<String, Value>>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload of `EMERGENCY_RESPONSE` and `HIGH_ALERT_RESPONSE`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseAction {
    /// Prevention actions the agent took, e.g. `"network_isolated"`.
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub detection_result: DetectionResult,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload of `ENHANCED_MONITORING`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnhancedMonitoring {
    #[serde(default)]
    pub detection_result: DetectionResult,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload of `STATUS_UPDATE` / `AGENT_STATUS`.
///
/// The agent sends these fields either at the top level of the envelope or
/// nested under `"data"`; the codec handles both shapes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub monitoring_active: Option<bool>,
    #[serde(default)]
    pub monitor_directory: Option<String>,
    #[serde(default)]
    pub detection_stats: Option<Map<String, Value>>,
}

/// Payload of `COMMAND_EXECUTED`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandExecuted {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload of the plain notification events (`MONITORING_*`, `ERROR`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
