//! Transient operator alerts.
//!
//! An [`Alert`] is a value: it carries its kind, its data, when it was
//! created, and how long it lives.  Scheduling its removal is the job of the
//! session's `AlertPresenter`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Millis;

/// Lifetime of a standard alert.
pub const STANDARD_ALERT_TTL: Duration = Duration::from_millis(10_000);

/// Lifetime of a toast notification.
pub const TOAST_ALERT_TTL: Duration = Duration::from_millis(5_000);

/// Identifier of one alert instance, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertId(u64);

impl AlertId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A threat was detected.
    Threat,
    /// The agent ran its emergency response.
    Emergency,
    /// The agent ran its high-alert response.
    HighAlert,
    /// The agent switched to enhanced monitoring.
    EnhancedMonitoring,
    /// Outcome of a console command or backend action.
    CommandResult,
    /// Monitoring was switched on or off.
    MonitoringChange,
    /// A backend request failed.
    BackendFailure,
    /// Reconnection gave up; the operator must reset.
    ConnectionFailed,
    /// The agent reported an error.
    ServerError,
}

impl AlertKind {
    /// Which TTL policy alerts of this kind use.
    pub fn ttl_policy(self) -> TtlPolicy {
        match self {
            AlertKind::Threat
            | AlertKind::Emergency
            | AlertKind::HighAlert
            | AlertKind::EnhancedMonitoring
            | AlertKind::ConnectionFailed => TtlPolicy::Standard,
            AlertKind::CommandResult
            | AlertKind::MonitoringChange
            | AlertKind::BackendFailure
            | AlertKind::ServerError => TtlPolicy::Toast,
        }
    }
}

/// The two alert lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlPolicy {
    Standard,
    Toast,
}

/// Configured lifetimes for both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTtls {
    pub standard: Duration,
    pub toast: Duration,
}

impl AlertTtls {
    pub fn ttl_for(&self, policy: TtlPolicy) -> Duration {
        match policy {
            TtlPolicy::Standard => self.standard,
            TtlPolicy::Toast => self.toast,
        }
    }
}

impl Default for AlertTtls {
    fn default() -> Self {
        Self {
            standard: STANDARD_ALERT_TTL,
            toast: TOAST_ALERT_TTL,
        }
    }
}

/// One alert instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    /// Headline shown to the operator.
    pub title: String,
    /// Event data copied from the message that raised the alert.
    pub data: Value,
    pub created_at: Millis,
    #[serde(with = "duration_ms")]
    pub ttl: Duration,
}

impl Alert {
    /// The earliest instant at which the alert may be removed.
    pub fn expires_at(&self) -> Millis {
        self.created_at.saturating_add(duration_to_millis(self.ttl))
    }
}

/// Converts a duration to whole milliseconds, saturating at `Millis::MAX`.
pub fn duration_to_millis(duration: Duration) -> Millis {
    Millis::try_from(duration.as_millis()).unwrap_or(Millis::MAX)
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::duration_to_millis(*ttl))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let ttls = AlertTtls::default();
        assert_eq!(ttls.ttl_for(TtlPolicy::Standard), Duration::from_millis(10_000));
        assert_eq!(ttls.ttl_for(TtlPolicy::Toast), Duration::from_millis(5_000));
    }

    #[test]
    fn test_threat_kinds_use_standard_ttl() {
        assert_eq!(AlertKind::Threat.ttl_policy(), TtlPolicy::Standard);
        assert_eq!(AlertKind::Emergency.ttl_policy(), TtlPolicy::Standard);
        assert_eq!(AlertKind::ConnectionFailed.ttl_policy(), TtlPolicy::Standard);
        assert_eq!(AlertKind::CommandResult.ttl_policy(), TtlPolicy::Toast);
        assert_eq!(AlertKind::BackendFailure.ttl_policy(), TtlPolicy::Toast);
    }

    #[test]
    fn test_expires_at_adds_ttl_to_creation_time() {
        let alert = Alert {
            id: AlertId::new(1),
            kind: AlertKind::Threat,
            title: "t".to_string(),
            data: Value::Null,
            created_at: 2_500,
            ttl: STANDARD_ALERT_TTL,
        };
        assert_eq!(alert.expires_at(), 12_500);
        assert_eq!(AlertId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_alert_serializes_ttl_as_millis() {
        let alert = Alert {
            id: AlertId::new(3),
            kind: AlertKind::HighAlert,
            title: "High alert".to_string(),
            data: serde_json::json!({"actions": ["isolate"]}),
            created_at: 0,
            ttl: TOAST_ALERT_TTL,
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["ttl"], 5_000);
        assert_eq!(value["kind"], "high_alert");
        assert_eq!(value["id"], 3);
    }
}
