//! Domain module: pure session state with no timers and no I/O.

pub mod alert;
pub mod backend;
pub mod event_log;
pub mod stats;
pub mod status;

/// Milliseconds on the session clock.
///
/// The origin is chosen by the driver (Unix epoch in the console binary, zero
/// in tests); the core only ever compares and adds these values.
pub type Millis = u64;
