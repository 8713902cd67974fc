//! Operator commands typed on the console's standard input.
//!
//! One line is one command.  Words are separated by whitespace:
//!
//! ```text
//! start                              START_MONITORING over the event stream
//! stop                               STOP_MONITORING
//! simulate [type] [level] [conf]     SIMULATE_THREAT, agent picks missing values
//! status                             GET_STATUS
//! dismiss <id>                       remove an alert early (`3` or `#3`)
//! reset                              back to Idle and reconnect (leaves Failed)
//! log                                print the event log, newest first
//! stats                              print the current statistics view
//! diag                               print session diagnostics
//! configure <monitor> <backup>       POST /configure on the backend
//! api-start                          POST /start-monitoring on the backend
//! api-simulate [type] [level] [conf] POST /simulate-threat on the backend
//! help                               list these commands
//! quit                               tear the session down and exit
//! ```
//!
//! Parsing is pure; [`apply_operator_command`] is the only function that
//! touches the session.

use std::fmt::Write as _;

use guardian_core::domain::alert::AlertId;
use guardian_core::domain::backend::{DirectoryConfig, ThreatSimulation};
use guardian_core::session::ports::{Renderer, Transport};
use guardian_core::{BackendRequest, CommandError, Scheduler, Session};
use thiserror::Error;

/// Text printed for `help`.
pub const HELP: &str = "\
commands:
  start | stop | status
  simulate [type] [level] [confidence]
  dismiss <id>
  reset
  log | stats | diag
  configure <monitor_dir> <backup_dir>
  api-start | api-simulate [type] [level] [confidence]
  quit";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    Start,
    Stop,
    Simulate {
        threat_type: Option<String>,
        threat_level: Option<String>,
        confidence: Option<f64>,
    },
    Status,
    Dismiss(AlertId),
    Reset,
    Log,
    Stats,
    Diag,
    Configure {
        monitor_directory: String,
        backup_directory: String,
    },
    ApiStart,
    ApiSimulate(ThreatSimulation),
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OperatorError {
    #[error("unknown command `{0}` (type `help`)")]
    UnknownCommand(String),

    #[error("`{command}` needs a <{argument}> argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("`{command}`: invalid {argument} `{value}`")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },
}

/// What the event loop should do after a command ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue,
    /// Text to show the operator.
    Print(String),
    Quit,
}

/// Parses one input line.  Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`OperatorError`] for unknown commands and for missing or
/// malformed arguments.
pub fn parse_operator_line(line: &str) -> Result<Option<OperatorCommand>, OperatorError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => OperatorCommand::Start,
        "stop" => OperatorCommand::Stop,
        "status" => OperatorCommand::Status,
        "reset" => OperatorCommand::Reset,
        "log" => OperatorCommand::Log,
        "stats" => OperatorCommand::Stats,
        "diag" => OperatorCommand::Diag,
        "help" | "?" => OperatorCommand::Help,
        "quit" | "exit" => OperatorCommand::Quit,
        "api-start" => OperatorCommand::ApiStart,
        "simulate" => {
            let (threat_type, threat_level, confidence) = simulate_args("simulate", &mut words)?;
            OperatorCommand::Simulate {
                threat_type,
                threat_level,
                confidence,
            }
        }
        "api-simulate" => {
            let (threat_type, threat_level, confidence) =
                simulate_args("api-simulate", &mut words)?;
            let defaults = ThreatSimulation::default();
            OperatorCommand::ApiSimulate(ThreatSimulation {
                threat_type: threat_type.unwrap_or(defaults.threat_type),
                threat_level: threat_level.unwrap_or(defaults.threat_level),
                confidence: confidence.unwrap_or(defaults.confidence),
            })
        }
        "dismiss" => {
            let raw = words.next().ok_or(OperatorError::MissingArgument {
                command: "dismiss",
                argument: "id",
            })?;
            let id = raw
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|_| OperatorError::InvalidArgument {
                    command: "dismiss",
                    argument: "id",
                    value: raw.to_string(),
                })?;
            OperatorCommand::Dismiss(AlertId::new(id))
        }
        "configure" => {
            let monitor_directory = words.next().ok_or(OperatorError::MissingArgument {
                command: "configure",
                argument: "monitor_dir",
            })?;
            let backup_directory = words.next().ok_or(OperatorError::MissingArgument {
                command: "configure",
                argument: "backup_dir",
            })?;
            OperatorCommand::Configure {
                monitor_directory: monitor_directory.to_string(),
                backup_directory: backup_directory.to_string(),
            }
        }
        other => return Err(OperatorError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

type SimulateArgs = (Option<String>, Option<String>, Option<f64>);

fn simulate_args<'a>(
    command: &'static str,
    words: &mut impl Iterator<Item = &'a str>,
) -> Result<SimulateArgs, OperatorError> {
    let threat_type = words.next().map(str::to_string);
    let threat_level = words.next().map(str::to_ascii_lowercase);
    let confidence = match words.next() {
        None => None,
        Some(raw) => {
            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|c| (0.0..=1.0).contains(c))
                .ok_or_else(|| OperatorError::InvalidArgument {
                    command,
                    argument: "confidence",
                    value: raw.to_string(),
                })?;
            Some(value)
        }
    };
    Ok((threat_type, threat_level, confidence))
}

/// Runs `command` against `session`.
///
/// Event-stream commands go through the session's dispatcher; backend actions
/// are queued on the session outbox for the event loop to execute.
///
/// # Errors
///
/// Returns the [`CommandError`] of a rejected event-stream command, most
/// often [`CommandError::NotConnected`].
pub fn apply_operator_command<T, R, S>(
    session: &mut Session<T, R, S>,
    command: OperatorCommand,
) -> Result<Outcome, CommandError>
where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    match command {
        OperatorCommand::Start => session.start_monitoring()?,
        OperatorCommand::Stop => session.stop_monitoring()?,
        OperatorCommand::Status => session.request_status()?,
        OperatorCommand::Simulate {
            threat_type,
            threat_level,
            confidence,
        } => session.simulate_threat(threat_type, threat_level, confidence)?,
        OperatorCommand::Dismiss(id) => {
            if !session.dismiss_alert(id) {
                return Ok(Outcome::Print(format!("no active alert {id}")));
            }
        }
        OperatorCommand::Reset => session.reset(),
        OperatorCommand::Log => return Ok(Outcome::Print(format_event_log(session))),
        OperatorCommand::Stats => return Ok(Outcome::Print(format_stats(session))),
        OperatorCommand::Diag => return Ok(Outcome::Print(format_diagnostics(session))),
        OperatorCommand::Configure {
            monitor_directory,
            backup_directory,
        } => session.request(BackendRequest::Configure(DirectoryConfig {
            monitor_directory,
            backup_directory,
            important_folders: Vec::new(),
        })),
        OperatorCommand::ApiStart => session.request(BackendRequest::StartMonitoring),
        OperatorCommand::ApiSimulate(simulation) => {
            session.request(BackendRequest::SimulateThreat(simulation))
        }
        OperatorCommand::Help => return Ok(Outcome::Print(HELP.to_string())),
        OperatorCommand::Quit => return Ok(Outcome::Quit),
    }
    Ok(Outcome::Continue)
}

fn format_event_log<T, R, S>(session: &Session<T, R, S>) -> String
where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    let log = session.event_log();
    if log.is_empty() {
        return "event log is empty".to_string();
    }
    let mut out = format!("event log ({}/{}):", log.len(), log.capacity());
    for entry in log.entries() {
        let _ = write!(
            out,
            "\n  {:>13} {:<8} {:<20} {}",
            entry.timestamp, entry.level, entry.event_type, entry.message
        );
    }
    out
}

fn format_stats<T, R, S>(session: &Session<T, R, S>) -> String
where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    let mut out = String::from("stats:");
    for (name, value) in session.stats().iter() {
        let _ = write!(out, "\n  {name:<22} {value}");
    }
    out
}

fn format_diagnostics<T, R, S>(session: &Session<T, R, S>) -> String
where
    T: Transport,
    R: Renderer,
    S: Scheduler,
{
    let d = session.diagnostics();
    let mut out = format!(
        "session {}\n  state {} ({}), reconnect attempts {}\n  \
         commands sent {}, rejected {}\n  \
         decode failures {}, stale frames {}\n  \
         active alerts {}, pending timers {}, event log {}",
        d.session_id,
        d.state,
        d.connection,
        d.reconnect_attempts,
        d.commands_sent,
        d.commands_rejected,
        d.decode_failures,
        d.stale_frames,
        d.active_alerts,
        d.pending_timers,
        d.event_log_len,
    );
    for (tag, count) in &d.unhandled_messages {
        let _ = write!(out, "\n  unhandled {tag}: {count}");
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
