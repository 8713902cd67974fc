//! Outbound commands, gated on the connection being up.

use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::codec::{encode_command, EncodeError};
use crate::protocol::commands::Command;
use crate::session::connection::{ConnectionManager, ConnectionState};
use crate::session::ports::{Transport, TransportError};

/// Why a command was not sent.
///
/// None of these are fatal.  Nothing is queued: the caller re-issues the
/// command once the connection is back.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    /// The connection is not in `Connected`; no I/O was attempted.
    #[error("not connected (connection is {0})")]
    NotConnected(ConnectionState),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Sends commands through a [`ConnectionManager`]'s transport.
#[derive(Debug, Default, Clone)]
pub struct CommandDispatcher {
    sent: u64,
    rejected: u64,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes and sends `command` if the connection is `Connected`.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotConnected`] in any other state, without touching the
    /// transport; otherwise whatever encoding or the transport reported.
    pub fn send<T: Transport>(
        &mut self,
        connection: &mut ConnectionManager<T>,
        command: &Command,
    ) -> Result<(), CommandError> {
        let state = connection.state();
        if state != ConnectionState::Connected {
            self.rejected += 1;
            debug!(command = command.type_tag(), %state, "command rejected: not connected");
            return Err(CommandError::NotConnected(state));
        }

        let frame = encode_command(command)?;
        if let Err(e) = connection.transport_mut().send(&frame) {
            warn!(command = command.type_tag(), "command send failed: {e}");
            return Err(e.into());
        }
        self.sent += 1;
        debug!(command = command.type_tag(), "command sent");
        Ok(())
    }

    pub fn start_monitoring<T: Transport>(
        &mut self,
        connection: &mut ConnectionManager<T>,
    ) -> Result<(), CommandError> {
        self.send(connection, &Command::StartMonitoring)
    }

    pub fn stop_monitoring<T: Transport>(
        &mut self,
        connection: &mut ConnectionManager<T>,
    ) -> Result<(), CommandError> {
        self.send(connection, &Command::StopMonitoring)
    }

    pub fn simulate_threat<T: Transport>(
        &mut self,
        connection: &mut ConnectionManager<T>,
        threat_type: Option<String>,
        threat_level: Option<String>,
        confidence: Option<f64>,
    ) -> Result<(), CommandError> {
        let command = Command::SimulateThreat {
            threat_type,
            threat_level,
            confidence,
        };
        self.send(connection, &command)
    }

    pub fn request_status<T: Transport>(
        &mut self,
        connection: &mut ConnectionManager<T>,
    ) -> Result<(), CommandError> {
        self.send(connection, &Command::GetStatus)
    }

    /// Commands handed to the transport successfully.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Commands refused because the connection was down.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
