//! JSON codec for event-stream frames.
//!
//! [`decode_frame`] turns one text frame into a typed [`Message`];
//! [`encode_command`] turns a [`Command`] into a text frame.
//!
//! Decoding happens in two steps: the frame is parsed into a
//! `serde_json::Value`, the `"type"` tag is read, and only then is the payload
//! deserialized into the variant for that tag.  A malformed frame is a
//! [`DecodeError`]; an unrecognised tag is *not* an error and yields
//! [`InboundMessage::Unknown`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::domain::Millis;
use crate::protocol::commands::Command;
use crate::protocol::messages::{tags, InboundMessage, Message};

/// Errors produced while decoding an inbound frame.
///
/// Every variant is recoverable: the caller drops the frame and keeps reading.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    Json(String),

    /// The frame is valid JSON but not an object.
    #[error("envelope is not a JSON object")]
    NotAnObject,

    /// The object has no string `"type"` field.
    #[error("envelope has no string `type` field")]
    MissingType,

    /// A known tag whose payload has the wrong shape.
    #[error("invalid {message_type} payload: {reason}")]
    Payload { message_type: String, reason: String },
}

/// Error produced while encoding an outbound command.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to encode {command}: {reason}")]
pub struct EncodeError {
    pub command: &'static str,
    pub reason: String,
}

/// Decodes one text frame received at `received_at` into a [`Message`].
///
/// # Errors
///
/// Returns a [`DecodeError`] when the frame is not a JSON object with a string
/// `"type"` field, or when a known message type carries a payload of the wrong
/// shape (for example `"actions": 5` instead of a list).
pub fn decode_frame(frame: &str, received_at: Millis) -> Result<Message, DecodeError> {
    let envelope: Value =
        serde_json::from_str(frame).map_err(|e| DecodeError::Json(e.to_string()))?;

    if !envelope.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    let message_type = envelope
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    let payload = decode_payload(&message_type, envelope)?;

    Ok(Message {
        message_type,
        payload,
        received_at,
    })
}

/// Encodes a command as a JSON text frame.
///
/// # Errors
///
/// Returns [`EncodeError`] if `serde_json` refuses the value.  The current
/// command set always serializes; the error path keeps the dispatcher from
/// panicking if a future command grows a non-serializable field.
pub fn encode_command(command: &Command) -> Result<String, EncodeError> {
    serde_json::to_string(command).map_err(|e| EncodeError {
        command: command.type_tag(),
        reason: e.to_string(),
    })
}

fn decode_payload(message_type: &str, envelope: Value) -> Result<InboundMessage, DecodeError> {
    let message = match message_type {
        tags::THREAT_DETECTED => {
            InboundMessage::ThreatDetected(payload_from(message_type, envelope)?)
        }
        tags::EMERGENCY_RESPONSE => {
            InboundMessage::EmergencyResponse(payload_from(message_type, envelope)?)
        }
        tags::HIGH_ALERT_RESPONSE => {
            InboundMessage::HighAlertResponse(payload_from(message_type, envelope)?)
        }
        tags::ENHANCED_MONITORING => {
            InboundMessage::EnhancedMonitoring(payload_from(message_type, envelope)?)
        }
        tags::STATUS_UPDATE | tags::AGENT_STATUS => {
            // Status replies nest their fields under "data"; pushed updates
            // may not.
            let body = match envelope.get("data") {
                Some(data) if data.is_object() => data.clone(),
                _ => envelope,
            };
            InboundMessage::StatusUpdate(payload_from(message_type, body)?)
        }
        tags::COMMAND_EXECUTED => {
            InboundMessage::CommandExecuted(payload_from(message_type, envelope)?)
        }
        tags::MONITORING_STARTED => {
            InboundMessage::MonitoringStarted(payload_from(message_type, envelope)?)
        }
        tags::MONITORING_STOPPED => {
            InboundMessage::MonitoringStopped(payload_from(message_type, envelope)?)
        }
        tags::ERROR => InboundMessage::Error(payload_from(message_type, envelope)?),
        other => InboundMessage::Unknown {
            tag: other.to_string(),
            payload: envelope,
        },
    };
    Ok(message)
}

fn payload_from<T: DeserializeOwned>(message_type: &str, body: Value) -> Result<T, DecodeError> {
    serde_json::from_value(body).map_err(|e| DecodeError::Payload {
        message_type: message_type.to_string(),
        reason: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
