//! Application layer for guardian-console.
//!
//! Turns what the operator types into calls on the session.  Nothing here
//! reads stdin or touches the network; the event loop feeds it lines and the
//! session's ports do the I/O.

pub mod operator;

pub use operator::{apply_operator_command, parse_operator_line, OperatorCommand, OperatorError, Outcome};
