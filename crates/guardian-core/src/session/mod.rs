//! Session module: the event-driven engine behind one console.
//!
//! A [`Session`] owns every piece of mutable state (connection, event log,
//! stats, alerts, monitoring status) together with the transport, the
//! renderer and the scheduler.  Nothing in it is global, so several sessions
//! can run side by side and tests build one per case.
//!
//! The session never blocks and never spawns.  The driver calls into it:
//!
//! - `on_transport_*` when the transport opens, delivers a frame, closes or
//!   fails;
//! - [`Session::advance_to`] as time passes, which fires due timers;
//! - [`Session::on_backend_result`] with the outcome of every request taken
//!   from [`Session::take_backend_requests`].

pub mod alerts;
pub mod connection;
pub mod dispatcher;
pub mod handlers;
pub mod mock;
pub mod ports;
pub mod router;
pub mod scheduler;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::alert::{AlertId, AlertKind, AlertTtls};
use crate::domain::backend::{AgentSummary, BackendError, BackendReply, BackendRequest};
use crate::domain::event_log::{EventLog, DEFAULT_EVENT_LOG_CAPACITY};
use crate::domain::stats::{StatsAggregator, StatsSnapshot};
use crate::domain::status::MonitoringStatus;
use crate::domain::Millis;
use crate::protocol::codec::decode_frame;
use crate::protocol::commands::Command;

use self::alerts::AlertPresenter;
use self::connection::{ConnectionId, ConnectionManager, ConnectionState, ReconnectPolicy, Transition};
use self::dispatcher::{CommandDispatcher, CommandError};
use self::ports::{Renderer, Transport, TransportError};
use self::router::{DispatchOutcome, HandlerContext, MessageRouter};
use self::scheduler::{PollTarget, Scheduler, TimerHandle, TimerQueue, TimerTask};

/// Chart series fed by the stats-summary poll.
pub const OVERVIEW_SERIES: &str = "overview";

/// Chart series fed by the agent-list poll.
pub const AGENTS_SERIES: &str = "agents";

/// Backend polling cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    pub enabled: bool,
    pub stats_interval: Duration,
    pub agents_interval: Duration,
    pub incidents_interval: Duration,
    /// How far back the incident poll looks.
    pub incident_window_hours: u32,
    /// How many incidents the incident poll asks for.
    pub incident_limit: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stats_interval: Duration::from_millis(5_000),
            agents_interval: Duration::from_millis(10_000),
            incidents_interval: Duration::from_millis(10_000),
            incident_window_hours: 24,
            incident_limit: 5,
        }
    }
}

/// Everything a [`Session`] can be tuned with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub reconnect: ReconnectPolicy,
    pub alert_ttls: AlertTtls,
    pub event_log_capacity: usize,
    pub polling: PollingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            alert_ttls: AlertTtls::default(),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            polling: PollingConfig::default(),
        }
    }
}

/// Unique id of one session, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Decoded and handled.
    Handled,
    /// Decoded, but no handler is registered for its type.
    Unhandled,
    /// Not valid JSON or not a valid envelope; dropped.
    Malformed,
    /// From a superseded connection, or arrived while not connected; dropped.
    Stale,
}

/// Counters for the `status` view and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub session_id: SessionId,
    pub state: ConnectionState,
    pub connection: ConnectionId,
    pub reconnect_attempts: u32,
    pub commands_sent: u64,
    pub commands_rejected: u64,
    pub unhandled_messages: BTreeMap<String, u64>,
    pub decode_failures: u64,
    pub stale_frames: u64,
    pub active_alerts: usize,
    pub pending_timers: usize,
    pub event_log_len: usize,
}

/// One console session.
pub struct Session<T, R, S = TimerQueue> {
    id: SessionId,
    config: SessionConfig,
    connection: ConnectionManager<T>,
    router: MessageRouter,
    dispatcher: CommandDispatcher,
    log: EventLog,
    stats: StatsAggregator,
    alerts: AlertPresenter,
    monitoring: MonitoringStatus,
    scheduler: S,
    renderer: R,
    poll_timers: HashMap<PollTarget, TimerHandle>,
    outbox: VecDeque<BackendRequest>,
    decode_failures: u64,
    stale_frames: u64,
    initialized: bool,
}

impl<T: Transport, R: Renderer> Session<T, R, TimerQueue> {
    /// Creates a session on a [`TimerQueue`] whose clock reads zero.
    pub fn new(transport: T, renderer: R, config: SessionConfig) -> Self {
        Self::with_scheduler(transport, renderer, TimerQueue::new(), config)
    }
}

impl<T: Transport, R: Renderer, S: Scheduler> Session<T, R, S> {
    /// Creates a session on the given scheduler.  Nothing happens until
    /// [`init`](Self::init).
    pub fn with_scheduler(transport: T, renderer: R, scheduler: S, config: SessionConfig) -> Self {
        Self {
            id: SessionId::new(),
            connection: ConnectionManager::new(transport, config.reconnect),
            router: handlers::default_router(),
            dispatcher: CommandDispatcher::new(),
            log: EventLog::with_capacity(config.event_log_capacity),
            stats: StatsAggregator::new(),
            alerts: AlertPresenter::new(config.alert_ttls),
            monitoring: MonitoringStatus::default(),
            scheduler,
            renderer,
            poll_timers: HashMap::new(),
            outbox: VecDeque::new(),
            decode_failures: 0,
            stale_frames: 0,
            initialized: false,
            config,
        }
    }

    /// Replaces the routing table.
    pub fn with_router(mut self, router: MessageRouter) -> Self {
        self.router = router;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Opens the connection and starts polling.  Calling it twice is a no-op.
    pub fn init(&mut self) {
        if self.initialized {
            debug!(session = %self.id, "init ignored: session already running");
            return;
        }
        self.initialized = true;
        info!(session = %self.id, "session starting");

        self.show_connection();
        let transition = self.connection.open(&mut self.scheduler);
        self.apply_transition(transition);

        if self.config.polling.enabled {
            for target in [
                PollTarget::StatsSummary,
                PollTarget::Agents,
                PollTarget::RecentIncidents,
            ] {
                self.poll(target);
            }
        }
    }

    /// Closes the transport and cancels every timer the session armed.
    pub fn teardown(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;

        let transition = self.connection.close(&mut self.scheduler);
        for (_, handle) in self.poll_timers.drain() {
            self.scheduler.cancel(handle);
        }
        self.alerts.clear(&mut self.scheduler, &mut self.renderer);
        self.outbox.clear();
        self.apply_transition(transition);
        info!(session = %self.id, "session stopped");
    }

    /// Returns the connection to `Idle` with zero attempts and opens it again.
    ///
    /// This is the only way out of `Failed`.
    pub fn reset(&mut self) {
        if !self.initialized {
            self.init();
            return;
        }
        info!(session = %self.id, from = %self.connection.state(), "resetting connection");
        let closed = self.connection.close(&mut self.scheduler);
        self.apply_transition(closed);
        let opened = self.connection.open(&mut self.scheduler);
        self.apply_transition(opened);
    }

    /// Moves the clock to `now`, running every timer due by then in deadline
    /// order.
    pub fn advance_to(&mut self, now: Millis) {
        while let Some((handle, task)) = self.scheduler.pop_due(now) {
            self.run_task(handle, task);
        }
        self.scheduler.advance_to(now);
    }

    /// Deadline of the next timer, for drivers that sleep until then.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }

    fn run_task(&mut self, handle: TimerHandle, task: TimerTask) {
        match task {
            TimerTask::Reconnect { connection } => {
                let transition =
                    self.connection
                        .on_reconnect_timer(handle, connection, &mut self.scheduler);
                self.apply_transition(transition);
            }
            TimerTask::AlertExpiry(id) => {
                self.alerts.expire(id, &mut self.renderer);
            }
            TimerTask::Poll(target) => {
                if self.poll_timers.get(&target) == Some(&handle) {
                    self.poll_timers.remove(&target);
                    self.poll(target);
                }
            }
        }
    }

    // ── Transport events ──────────────────────────────────────────────────────

    pub fn on_transport_open(&mut self, connection: ConnectionId) {
        let transition = self.connection.on_open(connection);
        self.apply_transition(transition);
    }

    /// Decodes and routes one text frame received on `connection`.
    pub fn on_transport_frame(&mut self, connection: ConnectionId, frame: &str) -> FrameOutcome {
        if !self.connection.is_current(connection)
            || self.connection.state() != ConnectionState::Connected
        {
            self.stale_frames += 1;
            debug!(%connection, "dropping frame from superseded connection");
            return FrameOutcome::Stale;
        }

        let message = match decode_frame(frame, self.scheduler.now()) {
            Ok(message) => message,
            Err(e) => {
                self.decode_failures += 1;
                warn!(%connection, "dropping malformed frame: {e}");
                return FrameOutcome::Malformed;
            }
        };

        let mut ctx = HandlerContext {
            log: &mut self.log,
            stats: &mut self.stats,
            alerts: &mut self.alerts,
            monitoring: &mut self.monitoring,
            scheduler: &mut self.scheduler,
            renderer: &mut self.renderer,
        };
        match self.router.dispatch(&mut ctx, &message) {
            DispatchOutcome::Handled => FrameOutcome::Handled,
            DispatchOutcome::Unhandled => FrameOutcome::Unhandled,
        }
    }

    pub fn on_transport_closed(&mut self, connection: ConnectionId) {
        let transition = self.connection.on_closed(connection, &mut self.scheduler);
        self.apply_transition(transition);
    }

    pub fn on_transport_error(&mut self, connection: ConnectionId, error: &TransportError) {
        let transition = self
            .connection
            .on_error(connection, error, &mut self.scheduler);
        self.apply_transition(transition);
    }

    fn apply_transition(&mut self, transition: Transition) {
        match transition {
            Transition::Unchanged => {}
            Transition::Connecting | Transition::Closed => self.show_connection(),
            Transition::Connected => {
                self.show_connection();
                // Resynchronise after any gap in the stream.
                if let Err(e) = self.dispatcher.request_status(&mut self.connection) {
                    self.command_failed(&e);
                }
            }
            Transition::Reconnecting { attempt, .. } => {
                self.renderer
                    .render_connection(ConnectionState::Disconnected, attempt - 1);
                self.show_connection();
            }
            Transition::Failed => {
                let attempts = self.connection.reconnect_attempts();
                self.renderer
                    .render_connection(ConnectionState::Disconnected, attempts);
                self.show_connection();
                self.alerts.present(
                    &mut self.scheduler,
                    &mut self.renderer,
                    AlertKind::ConnectionFailed,
                    "Connection lost: reconnect attempts exhausted, reset required",
                    json!({ "attempts": attempts }),
                );
            }
        }
    }

    fn show_connection(&mut self) {
        self.renderer.render_connection(
            self.connection.state(),
            self.connection.reconnect_attempts(),
        );
    }

    /// A send that failed at the transport ends the stream like any other
    /// transport error.
    fn command_failed(&mut self, error: &CommandError) {
        if let CommandError::Transport(e) = error {
            let current = self.connection.current();
            self.on_transport_error(current, e);
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Sends `command` if connected.
    ///
    /// # Errors
    ///
    /// See [`CommandDispatcher::send`].  A transport failure also starts the
    /// reconnect cycle.
    pub fn send_command(&mut self, command: &Command) -> Result<(), CommandError> {
        let result = self.dispatcher.send(&mut self.connection, command);
        if let Err(e) = &result {
            self.command_failed(e);
        }
        result
    }

    pub fn start_monitoring(&mut self) -> Result<(), CommandError> {
        self.send_command(&Command::StartMonitoring)
    }

    pub fn stop_monitoring(&mut self) -> Result<(), CommandError> {
        self.send_command(&Command::StopMonitoring)
    }

    pub fn simulate_threat(
        &mut self,
        threat_type: Option<String>,
        threat_level: Option<String>,
        confidence: Option<f64>,
    ) -> Result<(), CommandError> {
        self.send_command(&Command::SimulateThreat {
            threat_type,
            threat_level,
            confidence,
        })
    }

    pub fn request_status(&mut self) -> Result<(), CommandError> {
        self.send_command(&Command::GetStatus)
    }

    /// Removes an alert before its TTL.  Returns `false` if it is already gone.
    pub fn dismiss_alert(&mut self, id: AlertId) -> bool {
        self.alerts
            .dismiss(id, &mut self.scheduler, &mut self.renderer)
    }

    // ── Backend ───────────────────────────────────────────────────────────────

    /// Queues a backend request for the driver.
    pub fn request(&mut self, request: BackendRequest) {
        debug!(%request, "backend request queued");
        self.outbox.push_back(request);
    }

    /// Takes every queued backend request, oldest first.
    pub fn take_backend_requests(&mut self) -> Vec<BackendRequest> {
        self.outbox.drain(..).collect()
    }

    /// Applies the outcome of a request taken from the outbox.
    ///
    /// Failures are logged and shown as a toast; nothing is retried.
    pub fn on_backend_result(
        &mut self,
        request: &BackendRequest,
        result: Result<BackendReply, BackendError>,
    ) {
        if !self.initialized {
            debug!(%request, "dropping backend result: session stopped");
            return;
        }

        match result {
            Err(e) => {
                warn!(%request, "backend request failed: {e}");
                self.alerts.present(
                    &mut self.scheduler,
                    &mut self.renderer,
                    AlertKind::BackendFailure,
                    format!("{request} failed"),
                    json!({ "error": e.to_string() }),
                );
            }
            Ok(BackendReply::StatsSummary(summary)) => {
                self.merge_polled(OVERVIEW_SERIES, &summary.to_snapshot());
            }
            Ok(BackendReply::Agents(list)) => {
                let summary = AgentSummary::from_agents(&list.agents);
                self.renderer.render_agents(&list.agents, &summary);
                self.merge_polled(AGENTS_SERIES, &summary.to_snapshot());
            }
            Ok(BackendReply::Incidents(list)) => {
                self.renderer.render_incidents(&list.incidents);
            }
            Ok(BackendReply::Ack(ack)) => {
                info!(%request, "backend action acknowledged: {}", ack.summary());
                self.alerts.present(
                    &mut self.scheduler,
                    &mut self.renderer,
                    AlertKind::CommandResult,
                    format!("{request}: {}", ack.summary()),
                    json!({ "status": ack.status, "message": ack.message }),
                );
            }
        }
    }

    fn merge_polled(&mut self, series: &str, partial: &StatsSnapshot) {
        if self.stats.merge(partial) > 0 {
            self.renderer.update_chart(series, self.stats.current());
        }
    }

    fn poll(&mut self, target: PollTarget) {
        let polling = &self.config.polling;
        let (request, interval) = match target {
            PollTarget::StatsSummary => (BackendRequest::StatsSummary, polling.stats_interval),
            PollTarget::Agents => (BackendRequest::Agents, polling.agents_interval),
            PollTarget::RecentIncidents => (
                BackendRequest::RecentIncidents {
                    hours: polling.incident_window_hours,
                    limit: polling.incident_limit,
                },
                polling.incidents_interval,
            ),
        };
        self.request(request);
        let handle = self.scheduler.schedule(interval, TimerTask::Poll(target));
        self.poll_timers.insert(target, handle);
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.reconnect_attempts()
    }

    /// The id the driver must tag transport events with.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.current()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> &StatsSnapshot {
        self.stats.current()
    }

    pub fn alerts(&self) -> &AlertPresenter {
        &self.alerts
    }

    pub fn monitoring(&self) -> &MonitoringStatus {
        &self.monitoring
    }

    pub fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }

    pub fn transport(&self) -> &T {
        self.connection.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.connection.transport_mut()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        SessionDiagnostics {
            session_id: self.id,
            state: self.connection.state(),
            connection: self.connection.current(),
            reconnect_attempts: self.connection.reconnect_attempts(),
            commands_sent: self.dispatcher.sent(),
            commands_rejected: self.dispatcher.rejected(),
            unhandled_messages: self.router.unhandled_types().clone(),
            decode_failures: self.decode_failures,
            stale_frames: self.stale_frames,
            active_alerts: self.alerts.len(),
            pending_timers: self.scheduler.pending(),
            event_log_len: self.log.len(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::{AgentList, AgentStatus, StatsSummary};
    use crate::session::mock::{MockTransport, RecordingRenderer};

    fn quiet_config() -> SessionConfig {
        SessionConfig {
            polling: PollingConfig {
                enabled: false,
                ..PollingConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    fn connected_session(config: SessionConfig) -> Session<MockTransport, RecordingRenderer> {
        let mut session = Session::new(MockTransport::new(), RecordingRenderer::new(), config);
        session.init();
        let id = session.connection_id();
        session.on_transport_open(id);
        session
    }

    #[test]
    fn test_init_twice_opens_once() {
        let mut session = Session::new(MockTransport::new(), RecordingRenderer::new(), quiet_config());
        session.init();
        session.init();
        assert_eq!(session.transport().opened.len(), 1);
    }

    #[test]
    fn test_init_queues_first_polls_and_arms_intervals() {
        // Arrange
        let mut session = Session::new(
            MockTransport::new(),
            RecordingRenderer::new(),
            SessionConfig::default(),
        );

        // Act
        session.init();

        // Assert
        assert_eq!(
            session.take_backend_requests(),
            vec![
                BackendRequest::StatsSummary,
                BackendRequest::Agents,
                BackendRequest::RecentIncidents { hours: 24, limit: 5 },
            ]
        );
        assert_eq!(session.next_deadline(), Some(5_000));
    }

    #[test]
    fn test_polls_repeat_at_their_own_cadence() {
        let mut session = Session::new(
            MockTransport::new(),
            RecordingRenderer::new(),
            SessionConfig::default(),
        );
        session.init();
        session.take_backend_requests();

        session.advance_to(5_000);
        assert_eq!(session.take_backend_requests(), vec![BackendRequest::StatsSummary]);

        session.advance_to(10_000);
        let due = session.take_backend_requests();
        assert_eq!(due.len(), 3);
        assert!(due.contains(&BackendRequest::Agents));
    }

    #[test]
    fn test_frame_before_open_is_stale() {
        let mut session = Session::new(MockTransport::new(), RecordingRenderer::new(), quiet_config());
        session.init();
        let id = session.connection_id();

        let outcome = session.on_transport_frame(id, r#"{"type":"THREAT_DETECTED"}"#);

        assert_eq!(outcome, FrameOutcome::Stale);
        assert!(session.event_log().is_empty());
    }

    #[test]
    fn test_malformed_frame_is_dropped_and_stream_continues() {
        // Arrange
        let mut session = connected_session(quiet_config());
        let id = session.connection_id();

        // Act
        let bad = session.on_transport_frame(id, "{oops");
        let good = session.on_transport_frame(id, r#"{"type":"MONITORING_STARTED"}"#);

        // Assert
        assert_eq!(bad, FrameOutcome::Malformed);
        assert_eq!(good, FrameOutcome::Handled);
        assert_eq!(session.diagnostics().decode_failures, 1);
        assert_eq!(session.event_log().len(), 1);
    }

    #[test]
    fn test_send_failure_starts_reconnect() {
        // Arrange
        let mut session = connected_session(quiet_config());
        session.transport_mut().fail_send = true;

        // Act
        let result = session.start_monitoring();

        // Assert
        assert!(matches!(result, Err(CommandError::Transport(_))));
        assert_eq!(session.state(), ConnectionState::Reconnecting);
        assert_eq!(session.reconnect_attempts(), 1);
    }

    #[test]
    fn test_backend_summary_merges_into_stats() {
        // Arrange
        let mut session = connected_session(quiet_config());
        let summary: StatsSummary = serde_json::from_str(
            r#"{"topology":{"online_agents":2,"total_agents":3},
                "active_incidents":{"critical":1,"total":2}}"#,
        )
        .unwrap();

        // Act
        session.on_backend_result(
            &BackendRequest::StatsSummary,
            Ok(BackendReply::StatsSummary(summary)),
        );

        // Assert
        assert_eq!(session.stats().get("online_agents"), Some(2));
        assert_eq!(session.stats().get("critical_incidents"), Some(1));
        assert_eq!(session.stats().get("total_detections"), Some(0));
        assert_eq!(session.renderer().charts.last().unwrap().0, OVERVIEW_SERIES);
    }

    #[test]
    fn test_backend_agents_reply_derives_counts() {
        let mut session = connected_session(quiet_config());
        let list = AgentList {
            agents: vec![
                AgentStatus {
                    status: "online".into(),
                    ..Default::default()
                },
                AgentStatus {
                    status: "quarantined".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        session.on_backend_result(&BackendRequest::Agents, Ok(BackendReply::Agents(list)));

        assert_eq!(session.stats().get("agents_online"), Some(1));
        assert_eq!(session.stats().get("agents_quarantined"), Some(1));
        assert_eq!(session.stats().get("agents_offline"), Some(0));
        assert_eq!(session.renderer().agent_summaries.len(), 1);
    }

    #[test]
    fn test_backend_failure_raises_toast_without_retry() {
        let mut session = connected_session(quiet_config());

        session.on_backend_result(
            &BackendRequest::StatsSummary,
            Err(BackendError::Status { status: 500 }),
        );

        let alert = session.alerts().active().next().unwrap();
        assert_eq!(alert.kind, AlertKind::BackendFailure);
        assert_eq!(alert.title, "stats summary failed");
        assert!(session.take_backend_requests().is_empty());
    }

    #[test]
    fn test_backend_result_after_teardown_is_ignored() {
        let mut session = connected_session(quiet_config());
        session.teardown();

        session.on_backend_result(
            &BackendRequest::StartMonitoring,
            Err(BackendError::Request("refused".into())),
        );

        assert!(session.alerts().is_empty());
    }

    #[test]
    fn test_diagnostics_counts_commands() {
        let mut session = Session::new(MockTransport::new(), RecordingRenderer::new(), quiet_config());
        session.init();
        let _ = session.stop_monitoring();
        let id = session.connection_id();
        session.on_transport_open(id);

        let diag = session.diagnostics();
        assert_eq!(diag.commands_rejected, 1);
        assert_eq!(diag.commands_sent, 1);
        assert_eq!(diag.state, ConnectionState::Connected);
    }
}
