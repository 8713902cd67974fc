//! Handlers for the agent's event types and the default routing table.

use serde_json::{json, Value};

use crate::domain::alert::AlertKind;
use crate::domain::event_log::EventLevel;
use crate::domain::stats::StatsSnapshot;
use crate::protocol::messages::{tags, DetectionResult, InboundMessage, Message};
use crate::session::router::{HandlerContext, MessageRouter};

/// Chart series fed by detection counters.
pub const DETECTIONS_SERIES: &str = "detections";

/// A router with a handler for every event type the console understands.
pub fn default_router() -> MessageRouter {
    MessageRouter::new()
        .with(tags::THREAT_DETECTED, on_threat_detected)
        .with(tags::EMERGENCY_RESPONSE, on_emergency_response)
        .with(tags::HIGH_ALERT_RESPONSE, on_high_alert_response)
        .with(tags::ENHANCED_MONITORING, on_enhanced_monitoring)
        .with(tags::STATUS_UPDATE, on_status_update)
        .with(tags::AGENT_STATUS, on_status_update)
        .with(tags::COMMAND_EXECUTED, on_command_executed)
        .with(tags::MONITORING_STARTED, on_monitoring_changed)
        .with(tags::MONITORING_STOPPED, on_monitoring_changed)
        .with(tags::ERROR, on_error)
}

fn describe(result: &DetectionResult) -> String {
    let mut text = format!("{} ({})", result.label(), result.level());
    if let Some(confidence) = result.confidence {
        text.push_str(&format!(", {:.0}% confidence", confidence * 100.0));
    }
    if let Some(layer) = &result.primary_detection_layer {
        text.push_str(&format!(", {layer} layer"));
    }
    text
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn on_threat_detected(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::ThreatDetected(threat) = &msg.payload else {
        return false;
    };
    let level = EventLevel::from_threat_level(threat.data.level());
    let summary = describe(&threat.data);

    ctx.log_event(&msg.message_type, format!("Threat detected: {summary}"), level);
    if let Some(counters) = &threat.detection_stats {
        ctx.merge_stats(DETECTIONS_SERIES, &StatsSnapshot::from_json_object(counters));
    }
    ctx.raise(
        AlertKind::Threat,
        format!("Threat detected: {}", threat.data.label()),
        to_json(&threat.data),
    );
    true
}

fn on_emergency_response(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::EmergencyResponse(response) = &msg.payload else {
        return false;
    };
    ctx.log_event(
        &msg.message_type,
        format!(
            "Emergency response for {}: {}",
            response.detection_result.label(),
            response.actions.join(", ")
        ),
        EventLevel::Critical,
    );
    ctx.raise(
        AlertKind::Emergency,
        "Emergency response executed",
        json!({
            "actions": response.actions,
            "detection_result": to_json(&response.detection_result),
        }),
    );
    true
}

fn on_high_alert_response(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::HighAlertResponse(response) = &msg.payload else {
        return false;
    };
    ctx.log_event(
        &msg.message_type,
        format!(
            "High alert response for {}: {}",
            response.detection_result.label(),
            response.actions.join(", ")
        ),
        EventLevel::Error,
    );
    ctx.raise(
        AlertKind::HighAlert,
        "High alert response executed",
        json!({
            "actions": response.actions,
            "detection_result": to_json(&response.detection_result),
        }),
    );
    true
}

fn on_enhanced_monitoring(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::EnhancedMonitoring(event) = &msg.payload else {
        return false;
    };
    ctx.log_event(
        &msg.message_type,
        format!("Enhanced monitoring enabled: {}", describe(&event.detection_result)),
        EventLevel::Warning,
    );
    ctx.raise(
        AlertKind::EnhancedMonitoring,
        "Enhanced monitoring enabled",
        to_json(&event.detection_result),
    );
    true
}

// Status traffic is periodic, so it updates the view without logging.
fn on_status_update(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::StatusUpdate(status) = &msg.payload else {
        return false;
    };
    ctx.monitoring.apply(status);
    if let Some(counters) = &status.detection_stats {
        ctx.merge_stats(DETECTIONS_SERIES, &StatsSnapshot::from_json_object(counters));
    }
    ctx.show_monitoring();
    true
}

fn on_command_executed(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::CommandExecuted(result) = &msg.payload else {
        return false;
    };
    let command = result.command.as_deref().unwrap_or("command");
    let status = result.status.as_deref().unwrap_or("executed");
    let text = match &result.message {
        Some(detail) => format!("{command} {status}: {detail}"),
        None => format!("{command} {status}"),
    };
    let level = if status.eq_ignore_ascii_case("error") || status.eq_ignore_ascii_case("failed") {
        EventLevel::Error
    } else {
        EventLevel::Info
    };

    ctx.log_event(&msg.message_type, text.clone(), level);
    ctx.raise(
        AlertKind::CommandResult,
        text,
        json!({ "command": command, "status": status }),
    );
    true
}

fn on_monitoring_changed(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let (active, notice) = match &msg.payload {
        InboundMessage::MonitoringStarted(notice) => (true, notice),
        InboundMessage::MonitoringStopped(notice) => (false, notice),
        _ => return false,
    };
    let default_text = if active {
        "Monitoring started"
    } else {
        "Monitoring stopped"
    };
    let text = notice.message.as_deref().unwrap_or(default_text).to_string();

    ctx.monitoring.active = Some(active);
    ctx.show_monitoring();
    ctx.log_event(&msg.message_type, text.clone(), EventLevel::Info);
    ctx.raise(AlertKind::MonitoringChange, text, json!({ "active": active }));
    true
}

fn on_error(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
    let InboundMessage::Error(notice) = &msg.payload else {
        return false;
    };
    let text = notice
        .message
        .as_deref()
        .unwrap_or("agent reported an error")
        .to_string();
    ctx.log_event(&msg.message_type, text.clone(), EventLevel::Error);
    ctx.raise(AlertKind::ServerError, text, Value::Null);
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_log::EventLog;
    use crate::domain::stats::StatsAggregator;
    use crate::domain::status::MonitoringStatus;
    use crate::protocol::codec::decode_frame;
    use crate::session::alerts::AlertPresenter;
    use crate::session::mock::RecordingRenderer;
    use crate::session::router::DispatchOutcome;
    use crate::session::scheduler::{Scheduler, TimerQueue};

    #[derive(Default)]
    struct Fixture {
        log: EventLog,
        stats: StatsAggregator,
        alerts: AlertPresenter,
        monitoring: MonitoringStatus,
        timers: TimerQueue,
        renderer: RecordingRenderer,
    }

    impl Fixture {
        fn dispatch(&mut self, frame: &str) -> DispatchOutcome {
            self.dispatch_with(&mut default_router(), frame)
        }

        fn dispatch_with(&mut self, router: &mut MessageRouter, frame: &str) -> DispatchOutcome {
            let msg = decode_frame(frame, 0).unwrap();
            let mut ctx = HandlerContext {
                log: &mut self.log,
                stats: &mut self.stats,
                alerts: &mut self.alerts,
                monitoring: &mut self.monitoring,
                scheduler: &mut self.timers,
                renderer: &mut self.renderer,
            };
            router.dispatch(&mut ctx, &msg)
        }

        fn alert_count(&self) -> usize {
            self.alerts.len()
        }
    }

    #[test]
    fn test_threat_logs_merges_and_alerts() {
        // Arrange
        let mut fx = Fixture::default();

        // Act
        fx.dispatch(
            r#"{"type":"THREAT_DETECTED",
                "data":{"threat_type":"DEMO","threat_level":"critical","confidence":0.95,
                        "primary_detection_layer":"supervised"},
                "detection_stats":{"total_detections":1,"layer1_supervised":1}}"#,
        );

        // Assert
        let entry = fx.log.newest().unwrap();
        assert_eq!(entry.level, EventLevel::Critical);
        assert_eq!(entry.event_type, "THREAT_DETECTED");
        assert_eq!(
            entry.message,
            "Threat detected: DEMO (critical), 95% confidence, supervised layer"
        );
        assert_eq!(fx.stats.get("layer1_supervised"), Some(1));
        assert_eq!(fx.stats.get("layer2_anomaly"), Some(0));
        assert_eq!(fx.alert_count(), 1);
        assert_eq!(fx.renderer.charts.last().unwrap().0, DETECTIONS_SERIES);
    }

    #[test]
    fn test_high_threat_maps_to_error_level() {
        let mut fx = Fixture::default();
        fx.dispatch(r#"{"type":"THREAT_DETECTED","data":{"threat_level":"high"}}"#);
        assert_eq!(fx.log.newest().unwrap().level, EventLevel::Error);
    }

    #[test]
    fn test_emergency_response_is_critical() {
        let mut fx = Fixture::default();
        fx.dispatch(
            r#"{"type":"EMERGENCY_RESPONSE","actions":["network_isolated","processes_killed"],
                "detection_result":{"malware_process":"locker.exe"}}"#,
        );

        let entry = fx.log.newest().unwrap();
        assert_eq!(entry.level, EventLevel::Critical);
        assert_eq!(
            entry.message,
            "Emergency response for locker.exe: network_isolated, processes_killed"
        );
        assert_eq!(fx.renderer.alerts[0].kind, AlertKind::Emergency);
        assert_eq!(fx.renderer.alerts[0].data["actions"][0], "network_isolated");
    }

    #[test]
    fn test_status_update_merges_without_logging() {
        // Arrange
        let mut fx = Fixture::default();
        fx.stats.merge(&StatsSnapshot::new().with("layer3_rules", 7));

        // Act
        fx.dispatch(
            r#"{"type":"STATUS_UPDATE","monitoring_active":true,
                "detection_stats":{"total_detections":4}}"#,
        );

        // Assert
        assert!(fx.log.is_empty());
        assert_eq!(fx.stats.get("total_detections"), Some(4));
        assert_eq!(fx.stats.get("layer3_rules"), Some(7));
        assert_eq!(fx.monitoring.active, Some(true));
        assert_eq!(fx.renderer.monitoring.len(), 1);
        assert_eq!(fx.alert_count(), 0);
    }

    #[test]
    fn test_command_executed_raises_toast() {
        let mut fx = Fixture::default();
        fx.dispatch(r#"{"type":"COMMAND_EXECUTED","command":"START_MONITORING","status":"success"}"#);

        assert_eq!(fx.log.newest().unwrap().message, "START_MONITORING success");
        assert_eq!(fx.renderer.alerts[0].kind, AlertKind::CommandResult);
        assert_eq!(fx.timers.next_deadline(), Some(5_000));
    }

    #[test]
    fn test_monitoring_stopped_clears_flag() {
        let mut fx = Fixture::default();
        fx.dispatch(r#"{"type":"MONITORING_STARTED"}"#);
        fx.dispatch(r#"{"type":"MONITORING_STOPPED","message":"Stopped by operator"}"#);

        assert_eq!(fx.monitoring.active, Some(false));
        assert_eq!(fx.log.newest().unwrap().message, "Stopped by operator");
        assert_eq!(fx.log.len(), 2);
    }

    #[test]
    fn test_error_event_logs_at_error_level() {
        let mut fx = Fixture::default();
        fx.dispatch(r#"{"type":"ERROR","message":"Unknown command"}"#);

        assert_eq!(fx.log.newest().unwrap().level, EventLevel::Error);
        assert_eq!(fx.renderer.alerts[0].kind, AlertKind::ServerError);
    }

    #[test]
    fn test_default_handlers_report_handled() {
        let mut fx = Fixture::default();
        assert_eq!(fx.dispatch(r#"{"type":"ERROR"}"#), DispatchOutcome::Handled);
        assert_eq!(fx.dispatch(r#"{"type":"AGENT_STATUS"}"#), DispatchOutcome::Handled);
    }

    #[test]
    fn test_handler_under_foreign_tag_reports_unhandled() {
        // Arrange: the threat handler bound to a tag whose payload it cannot read
        let mut fx = Fixture::default();
        let mut router = MessageRouter::new().with("THREAT_V2", on_threat_detected);

        // Act
        let outcome = fx.dispatch_with(&mut router, r#"{"type":"THREAT_V2","data":{}}"#);

        // Assert
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(router.unhandled_total(), 1);
        assert!(fx.log.is_empty());
        assert_eq!(fx.alert_count(), 0);
    }
}
