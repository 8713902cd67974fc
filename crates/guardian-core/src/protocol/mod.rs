//! Protocol module: event-stream envelopes and their JSON codec.

pub mod codec;
pub mod commands;
pub mod messages;

pub use codec::{decode_frame, encode_command, DecodeError, EncodeError};
pub use commands::Command;
pub use messages::{tags, InboundMessage, Message};
