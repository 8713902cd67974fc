//! Message routing by type tag.
//!
//! The router is a table from tag to handler function.  The table is data:
//! callers add, replace or remove entries without touching
//! [`MessageRouter::dispatch`].  A message whose tag has no entry is counted
//! and dropped; it never reaches the event log and never stops the stream.
//!
//! Unhandled tags are counted individually up to [`MAX_TRACKED_UNHANDLED`]
//! distinct names.  Past that, new names share the [`OTHER_UNHANDLED`]
//! bucket, so a peer inventing tags cannot grow the table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::alert::{AlertId, AlertKind};
use crate::domain::event_log::{EventLevel, EventLog, EventLogEntry};
use crate::domain::stats::{StatsAggregator, StatsSnapshot};
use crate::domain::status::MonitoringStatus;
use crate::protocol::messages::Message;
use crate::session::alerts::AlertPresenter;
use crate::session::ports::Renderer;
use crate::session::scheduler::Scheduler;

/// Most distinct unhandled tags counted by name.
pub const MAX_TRACKED_UNHANDLED: usize = 64;

/// Bucket for unhandled tags seen after the table is full.
pub const OTHER_UNHANDLED: &str = "<other>";

/// A message handler.
///
/// Returns `false` when the message's payload is not one it understands;
/// the router then reports the message as unhandled.
pub type Handler = fn(&mut HandlerContext<'_>, &Message) -> bool;

/// The session state a handler may touch while it runs.
pub struct HandlerContext<'a> {
    pub log: &'a mut EventLog,
    pub stats: &'a mut StatsAggregator,
    pub alerts: &'a mut AlertPresenter,
    pub monitoring: &'a mut MonitoringStatus,
    pub scheduler: &'a mut dyn Scheduler,
    pub renderer: &'a mut dyn Renderer,
}

impl HandlerContext<'_> {
    /// Appends an entry stamped with the current time and redraws the log.
    pub fn log_event(&mut self, event_type: &str, message: impl Into<String>, level: EventLevel) {
        let entry = EventLogEntry::new(event_type, message, level, self.scheduler.now());
        self.log.append(entry);
        self.renderer.render_event_log(self.log.entries());
    }

    /// Merges a partial snapshot and redraws `series` when anything changed.
    pub fn merge_stats(&mut self, series: &str, partial: &StatsSnapshot) {
        if self.stats.merge(partial) > 0 {
            self.renderer.update_chart(series, self.stats.current());
        }
    }

    /// Raises an alert with its kind's default TTL.
    pub fn raise(&mut self, kind: AlertKind, title: impl Into<String>, data: Value) -> AlertId {
        self.alerts
            .present(&mut *self.scheduler, &mut *self.renderer, kind, title, data)
    }

    /// Redraws the monitoring indicator.
    pub fn show_monitoring(&mut self) {
        self.renderer.render_monitoring(self.monitoring);
    }
}

/// Whether [`MessageRouter::dispatch`] found a handler that accepted the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Unhandled,
}

/// Tag → handler table plus diagnostics for unhandled tags.
#[derive(Default, Clone)]
pub struct MessageRouter {
    handlers: HashMap<String, Handler>,
    unhandled: BTreeMap<String, u64>,
    unhandled_total: u64,
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("MessageRouter")
            .field("handlers", &tags)
            .field("unhandled", &self.unhandled)
            .finish()
    }
}

impl MessageRouter {
    /// A router with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `message_type`, returning the one it replaces.
    pub fn register(&mut self, message_type: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.handlers.insert(message_type.into(), handler)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, message_type: impl Into<String>, handler: Handler) -> Self {
        self.register(message_type, handler);
        self
    }

    pub fn unregister(&mut self, message_type: &str) -> Option<Handler> {
        self.handlers.remove(message_type)
    }

    pub fn handles(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Runs the handler registered for `message.message_type`.
    pub fn dispatch(&mut self, ctx: &mut HandlerContext<'_>, message: &Message) -> DispatchOutcome {
        let Some(&handler) = self.handlers.get(message.message_type.as_str()) else {
            self.record_unhandled(&message.message_type);
            return DispatchOutcome::Unhandled;
        };
        debug!(message_type = %message.message_type, "dispatching");
        if handler(ctx, message) {
            DispatchOutcome::Handled
        } else {
            debug!(message_type = %message.message_type, "handler rejected payload");
            self.unhandled_total += 1;
            DispatchOutcome::Unhandled
        }
    }

    fn record_unhandled(&mut self, message_type: &str) {
        self.unhandled_total += 1;
        if let Some(count) = self.unhandled.get_mut(message_type) {
            *count += 1;
            debug!(message_type, count = *count, "unhandled message type");
            return;
        }
        // One slot stays free for the overflow bucket.
        if self.unhandled.len() < MAX_TRACKED_UNHANDLED - 1 {
            self.unhandled.insert(message_type.to_string(), 1);
            warn!(message_type, "no handler for message type, ignoring");
            return;
        }
        let other = self.unhandled.entry(OTHER_UNHANDLED.to_string()).or_insert(0);
        *other += 1;
        if *other == 1 {
            warn!(
                message_type,
                limit = MAX_TRACKED_UNHANDLED,
                "too many unhandled message types, counting the rest together"
            );
        } else {
            debug!(message_type, "unhandled message type");
        }
    }

    /// How often each unhandled tag was seen.
    ///
    /// Holds at most [`MAX_TRACKED_UNHANDLED`] entries, one of which may be
    /// [`OTHER_UNHANDLED`].
    pub fn unhandled_types(&self) -> &BTreeMap<String, u64> {
        &self.unhandled
    }

    /// Total unhandled messages, including ones a handler rejected.
    pub fn unhandled_total(&self) -> u64 {
        self.unhandled_total
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertTtls;
    use crate::protocol::codec::decode_frame;
    use crate::session::mock::RecordingRenderer;
    use crate::session::scheduler::TimerQueue;

    struct Fixture {
        log: EventLog,
        stats: StatsAggregator,
        alerts: AlertPresenter,
        monitoring: MonitoringStatus,
        timers: TimerQueue,
        renderer: RecordingRenderer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                log: EventLog::new(),
                stats: StatsAggregator::new(),
                alerts: AlertPresenter::new(AlertTtls::default()),
                monitoring: MonitoringStatus::default(),
                timers: TimerQueue::new(),
                renderer: RecordingRenderer::new(),
            }
        }

        fn ctx(&mut self) -> HandlerContext<'_> {
            HandlerContext {
                log: &mut self.log,
                stats: &mut self.stats,
                alerts: &mut self.alerts,
                monitoring: &mut self.monitoring,
                scheduler: &mut self.timers,
                renderer: &mut self.renderer,
            }
        }
    }

    fn log_ping(ctx: &mut HandlerContext<'_>, msg: &Message) -> bool {
        ctx.log_event(&msg.message_type, "ping", EventLevel::Info);
        true
    }

    fn reject(_: &mut HandlerContext<'_>, _: &Message) -> bool {
        false
    }

    #[test]
    fn test_dispatch_runs_registered_handler() {
        // Arrange
        let mut fx = Fixture::new();
        let mut router = MessageRouter::new().with("PING", log_ping);
        let msg = decode_frame(r#"{"type":"PING"}"#, 0).unwrap();

        // Act
        let outcome = router.dispatch(&mut fx.ctx(), &msg);

        // Assert
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(fx.log.len(), 1);
        assert_eq!(fx.renderer.event_log_renders, 1);
    }

    #[test]
    fn test_unknown_type_is_counted_not_logged() {
        // Arrange
        let mut fx = Fixture::new();
        let mut router = MessageRouter::new().with("PING", log_ping);
        let msg = decode_frame(r#"{"type":"FOO_UNKNOWN"}"#, 0).unwrap();

        // Act
        let first = router.dispatch(&mut fx.ctx(), &msg);
        router.dispatch(&mut fx.ctx(), &msg);

        // Assert
        assert_eq!(first, DispatchOutcome::Unhandled);
        assert!(fx.log.is_empty());
        assert_eq!(router.unhandled_types().get("FOO_UNKNOWN"), Some(&2));
        assert_eq!(router.unhandled_total(), 2);
    }

    #[test]
    fn test_register_replaces_and_unregister_removes() {
        let mut router = MessageRouter::new();
        assert!(router.register("PING", log_ping).is_none());
        assert!(router.register("PING", reject).is_some());
        assert!(router.handles("PING"));
        assert!(router.unregister("PING").is_some());
        assert!(!router.handles("PING"));
    }

    #[test]
    fn test_merge_stats_only_redraws_on_change() {
        let mut fx = Fixture::new();
        let partial = StatsSnapshot::new().with("total_detections", 2);

        fx.ctx().merge_stats("detections", &partial);
        fx.ctx().merge_stats("detections", &partial);

        assert_eq!(fx.renderer.charts.len(), 1);
        assert_eq!(fx.stats.get("total_detections"), Some(2));
    }

    #[test]
    fn test_distinct_unknown_types_are_capped() {
        // Arrange
        let mut fx = Fixture::new();
        let mut router = MessageRouter::new();
        let sent = MAX_TRACKED_UNHANDLED as u64 * 3;

        // Act
        for n in 0..sent {
            let msg = decode_frame(&format!(r#"{{"type":"X_{n}"}}"#), 0).unwrap();
            router.dispatch(&mut fx.ctx(), &msg);
        }

        // Assert
        let types = router.unhandled_types();
        assert_eq!(types.len(), MAX_TRACKED_UNHANDLED);
        assert_eq!(types.get("X_0"), Some(&1));
        let named = MAX_TRACKED_UNHANDLED as u64 - 1;
        assert_eq!(types.get(OTHER_UNHANDLED), Some(&(sent - named)));
        assert_eq!(router.unhandled_total(), sent);
    }

    #[test]
    fn test_tracked_type_keeps_counting_after_cap() {
        // Arrange: fill the table, then repeat the first tag
        let mut fx = Fixture::new();
        let mut router = MessageRouter::new();
        for n in 0..MAX_TRACKED_UNHANDLED * 2 {
            let msg = decode_frame(&format!(r#"{{"type":"X_{n}"}}"#), 0).unwrap();
            router.dispatch(&mut fx.ctx(), &msg);
        }
        let first = decode_frame(r#"{"type":"X_0"}"#, 0).unwrap();

        // Act
        router.dispatch(&mut fx.ctx(), &first);

        // Assert
        assert_eq!(router.unhandled_types().get("X_0"), Some(&2));
        assert_eq!(router.unhandled_types().len(), MAX_TRACKED_UNHANDLED);
    }

    #[test]
    fn test_rejecting_handler_reports_unhandled() {
        // Arrange
        let mut fx = Fixture::new();
        let mut router = MessageRouter::new().with("PING", reject);
        let msg = decode_frame(r#"{"type":"PING"}"#, 0).unwrap();

        // Act
        let outcome = router.dispatch(&mut fx.ctx(), &msg);

        // Assert
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(router.unhandled_total(), 1);
        assert!(router.unhandled_types().is_empty());
        assert!(fx.log.is_empty());
    }
}
