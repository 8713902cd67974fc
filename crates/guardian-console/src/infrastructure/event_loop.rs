//! The Tokio event loop that drives one [`Session`].
//!
//! The session is synchronous and single-threaded; this loop is the only code
//! that touches it.  Each iteration waits for the first of:
//!
//! - a [`TransportEvent`] from the WebSocket task,
//! - a line of operator input on stdin,
//! - a finished backend request,
//! - the next session timer deadline (capped at [`SHUTDOWN_POLL`] so the
//!   `running` flag is checked regularly),
//!
//! then advances the session clock, applies the wake-up, and spawns a task
//! for every backend request the session queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use guardian_core::domain::alert::duration_to_millis;
use guardian_core::{
    BackendError, BackendReply, BackendRequest, Millis, Renderer, Scheduler, Session, TimerQueue,
    Transport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::{apply_operator_command, parse_operator_line, Outcome};
use crate::domain::config::ConsoleConfig;
use crate::infrastructure::http_backend::{Backend, HttpBackend};
use crate::infrastructure::tracing_renderer::TracingRenderer;
use crate::infrastructure::ws_transport::{TransportEvent, WsTransport};

/// Longest the loop sleeps before re-checking the shutdown flag.
pub const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// A finished backend request and its outcome.
pub type BackendResult = (BackendRequest, Result<BackendReply, BackendError>);

/// Monotonic session clock anchored at the Unix time the console started.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
    origin_ms: Millis,
}

impl SessionClock {
    pub fn start() -> Self {
        let origin_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(duration_to_millis)
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            origin_ms,
        }
    }

    pub fn now(&self) -> Millis {
        self.origin_ms
            .saturating_add(duration_to_millis(self.origin.elapsed()))
    }

    /// How long to sleep until `deadline`, capped at [`SHUTDOWN_POLL`].
    pub fn sleep_until(&self, deadline: Option<Millis>) -> Duration {
        match deadline {
            Some(at) => Duration::from_millis(at.saturating_sub(self.now())).min(SHUTDOWN_POLL),
            None => SHUTDOWN_POLL,
        }
    }
}

enum Wake {
    Transport(TransportEvent),
    Input(String),
    InputClosed,
    Backend(BackendResult),
    Tick,
}

/// Runs the console until `running` is cleared or the operator types `quit`.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.  Connection
/// and backend failures are not errors: the session reconnects, and shows
/// failures to the operator.
pub async fn run_console(config: ConsoleConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(&config.backend.api_base, config.request_timeout())
            .with_context(|| format!("failed to build HTTP client for {}", config.backend.api_base))?,
    );
    let (transport, mut transport_events) = WsTransport::new(config.connection.ws_url.clone());
    let clock = SessionClock::start();
    let mut session = Session::with_scheduler(
        transport,
        TracingRenderer::new(),
        TimerQueue::starting_at(clock.now()),
        config.session_config(),
    );
    let (results_tx, mut results) = mpsc::channel::<BackendResult>(64);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    info!(
        session = %session.id(),
        ws_url = %config.connection.ws_url,
        api_base = %config.backend.api_base,
        "console starting (type `help` for commands)"
    );
    session.init();
    spawn_backend_requests(&mut session, &backend, &results_tx);

    while running.load(Ordering::Relaxed) {
        let sleep_for = clock.sleep_until(session.next_deadline());

        let wake = tokio::select! {
            Some(event) = transport_events.recv() => Wake::Transport(event),
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) => Wake::Input(line),
                Ok(None) => Wake::InputClosed,
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    Wake::InputClosed
                }
            },
            Some(result) = results.recv() => Wake::Backend(result),
            _ = tokio::time::sleep(sleep_for) => Wake::Tick,
        };

        session.advance_to(clock.now());

        match wake {
            Wake::Transport(event) => handle_transport_event(&mut session, event),
            Wake::Input(line) => {
                if handle_operator_line(&mut session, &line) == Some(Outcome::Quit) {
                    info!("quit requested");
                    running.store(false, Ordering::Relaxed);
                }
            }
            Wake::InputClosed => {
                debug!("stdin closed; operator commands disabled");
                input_open = false;
            }
            Wake::Backend((request, result)) => session.on_backend_result(&request, result),
            Wake::Tick => {}
        }

        spawn_backend_requests(&mut session, &backend, &results_tx);
    }

    session.teardown();
    let d = session.diagnostics();
    info!(
        commands_sent = d.commands_sent,
        commands_rejected = d.commands_rejected,
        decode_failures = d.decode_failures,
        stale_frames = d.stale_frames,
        "console stopped"
    );
    Ok(())
}

/// Feeds one transport event into the session.
pub fn handle_transport_event<T, R, S>(session: &mut Session<T, R, S>, event: TransportEvent)
where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    match event {
        TransportEvent::Opened(id) => session.on_transport_open(id),
        TransportEvent::Frame(id, frame) => {
            session.on_transport_frame(id, &frame);
        }
        TransportEvent::Closed(id) => session.on_transport_closed(id),
        TransportEvent::Failed(id, error) => session.on_transport_error(id, &error),
    }
}

/// Parses and applies one line of operator input.
///
/// Returns the command outcome, or `None` for blank or rejected lines.
pub fn handle_operator_line<T, R, S>(session: &mut Session<T, R, S>, line: &str) -> Option<Outcome>
where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    let command = match parse_operator_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return None,
        Err(e) => {
            warn!("{e}");
            return None;
        }
    };
    match apply_operator_command(session, command) {
        Ok(Outcome::Print(text)) => {
            println!("{text}");
            Some(Outcome::Print(text))
        }
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("command rejected: {e}");
            None
        }
    }
}

/// Spawns one task per queued backend request; results arrive on `results`.
pub fn spawn_backend_requests<T, R, S>(
    session: &mut Session<T, R, S>,
    backend: &Arc<dyn Backend>,
    results: &mpsc::Sender<BackendResult>,
) where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    for request in session.take_backend_requests() {
        let backend = Arc::clone(backend);
        let results = results.clone();
        tokio::spawn(async move {
            let outcome = backend.execute(&request).await;
            if results.send((request, outcome)).await.is_err() {
                debug!("backend result dropped: console stopped");
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_backend::MockBackend;
    use guardian_core::domain::backend::{ActionAck, StatsSummary};
    use guardian_core::session::mock::{MockTransport, RecordingRenderer};
    use guardian_core::{ConnectionState, SessionConfig, TransportError};

    fn session() -> Session<MockTransport, RecordingRenderer> {
        let mut config = SessionConfig::default();
        config.polling.enabled = false;
        Session::new(MockTransport::new(), RecordingRenderer::new(), config)
    }

    #[test]
    fn test_sleep_is_capped_at_shutdown_poll() {
        let clock = SessionClock::start();
        assert_eq!(clock.sleep_until(None), SHUTDOWN_POLL);
        assert_eq!(clock.sleep_until(Some(clock.now() + 60_000)), SHUTDOWN_POLL);
        assert_eq!(clock.sleep_until(Some(0)), Duration::ZERO);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = SessionClock::start();
        let first = clock.now();
        assert!(clock.now() >= first);
    }

    #[test]
    fn test_transport_events_drive_connection_state() {
        // Arrange
        let mut session = session();
        session.init();
        let id = session.connection_id();

        // Act
        handle_transport_event(&mut session, TransportEvent::Opened(id));
        handle_transport_event(
            &mut session,
            TransportEvent::Frame(id, r#"{"type":"MONITORING_STARTED"}"#.to_string()),
        );

        // Assert
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(session.monitoring().active, Some(true));
    }

    #[test]
    fn test_transport_failure_starts_reconnect() {
        // Arrange
        let mut session = session();
        session.init();
        let id = session.connection_id();
        handle_transport_event(&mut session, TransportEvent::Opened(id));

        // Act
        handle_transport_event(
            &mut session,
            TransportEvent::Failed(id, TransportError::Send("broken pipe".into())),
        );

        // Assert
        assert_eq!(session.state(), ConnectionState::Reconnecting);
        assert_eq!(session.reconnect_attempts(), 1);
    }

    #[test]
    fn test_operator_line_rejected_when_not_connected() {
        let mut session = session();
        session.init();
        assert_eq!(handle_operator_line(&mut session, "start"), None);
        assert!(session.transport().sent.is_empty());
    }

    #[test]
    fn test_operator_quit_line() {
        let mut session = session();
        assert_eq!(handle_operator_line(&mut session, "quit"), Some(Outcome::Quit));
        assert_eq!(handle_operator_line(&mut session, "bogus"), None);
    }

    #[tokio::test]
    async fn test_backend_requests_are_executed_and_reported() {
        // Arrange
        let mut mock = MockBackend::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(BackendReply::Ack(ActionAck {
                status: Some("success".to_string()),
                message: Some("monitoring started".to_string()),
            }))
        });
        let backend: Arc<dyn Backend> = Arc::new(mock);
        let (tx, mut rx) = mpsc::channel(4);
        let mut session = session();
        session.init();
        session.request(BackendRequest::StartMonitoring);

        // Act
        spawn_backend_requests(&mut session, &backend, &tx);
        let (request, result) = rx.recv().await.unwrap();
        session.on_backend_result(&request, result);

        // Assert
        assert_eq!(request, BackendRequest::StartMonitoring);
        assert!(session.take_backend_requests().is_empty());
        assert_eq!(session.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_poll_reply_updates_stats() {
        // Arrange
        let mut mock = MockBackend::new();
        mock.expect_execute()
            .returning(|_| Ok(BackendReply::StatsSummary(StatsSummary::default())));
        let backend: Arc<dyn Backend> = Arc::new(mock);
        let (tx, mut rx) = mpsc::channel(4);
        let mut session = session();
        session.init();
        session.request(BackendRequest::StatsSummary);

        // Act
        spawn_backend_requests(&mut session, &backend, &tx);
        let (request, result) = rx.recv().await.unwrap();
        session.on_backend_result(&request, result);

        // Assert
        assert_eq!(session.stats().get("total_agents"), Some(0));
    }
}
