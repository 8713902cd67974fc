//! Outbound commands sent from the console to the agent over the event stream.
//!
//! Commands use serde's internally tagged representation, so a command
//! serializes to a single flat JSON object:
//!
//! ```json
//! {"type":"GET_STATUS"}
//! {"type":"SIMULATE_THREAT","threat_type":"DEMO","threat_level":"critical","confidence":0.95}
//! ```
//!
//! A `Command` is ephemeral: it exists only for the duration of one send
//! attempt and is never queued or persisted.

use serde::{Deserialize, Serialize};

/// Every command the console can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Start real-time file-system monitoring on the agent.
    StartMonitoring,
    /// Stop real-time monitoring.
    StopMonitoring,
    /// Ask the agent to inject a demo threat into its detection pipeline.
    ///
    /// All parameters are optional; the agent picks its own demo values for
    /// anything left out.
    SimulateThreat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threat_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threat_level: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// Request a full status snapshot (`AGENT_STATUS` reply).
    GetStatus,
}

impl Command {
    /// A `SIMULATE_THREAT` command that lets the agent choose every parameter.
    pub fn simulate_default() -> Self {
        Command::SimulateThreat {
            threat_type: None,
            threat_level: None,
            confidence: None,
        }
    }

    /// The wire tag for this command.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Command::StartMonitoring => "START_MONITORING",
            Command::StopMonitoring => "STOP_MONITORING",
            Command::SimulateThreat { .. } => "SIMULATE_THREAT",
            Command::GetStatus => "GET_STATUS",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_command_serializes_to_type_only() {
        let json = serde_json::to_string(&Command::GetStatus).unwrap();
        assert_eq!(json, r#"{"type":"GET_STATUS"}"#);
    }

    #[test]
    fn test_simulate_threat_omits_absent_parameters() {
        // Arrange
        let cmd = Command::SimulateThreat {
            threat_type: Some("DEMO".to_string()),
            threat_level: None,
            confidence: Some(0.5),
        };

        // Act
        let value: serde_json::Value = serde_json::to_value(&cmd).unwrap();

        // Assert
        assert_eq!(value["type"], "SIMULATE_THREAT");
        assert_eq!(value["threat_type"], "DEMO");
        assert_eq!(value["confidence"], 0.5);
        assert!(value.get("threat_level").is_none());
    }

    #[test]
    fn test_type_tag_matches_serialized_tag() {
        for cmd in [
            Command::StartMonitoring,
            Command::StopMonitoring,
            Command::simulate_default(),
            Command::GetStatus,
        ] {
            let value = serde_json::to_value(&cmd).unwrap();
            assert_eq!(value["type"], cmd.type_tag());
        }
    }
}
