//! Infrastructure layer for guardian-console.
//!
//! All I/O lives here: the WebSocket client for the agent's event stream,
//! the HTTP client for the backend, the tracing renderer, and the Tokio loop
//! that ties them to a session.
//!
//! # What does NOT belong here?
//!
//! - Operator command parsing (that is the application layer)
//! - Connection state, routing, alert lifetimes (that is `guardian-core`)
//! - Configuration parsing (that is the domain layer and `main.rs`)

pub mod event_loop;
pub mod http_backend;
pub mod tracing_renderer;
pub mod ws_transport;

// Re-export the entry point so `main.rs` can call it concisely.
pub use event_loop::run_console;
