//! guardian-console library crate.
//!
//! The I/O side of the Guardian console: everything that touches a socket,
//! an HTTP client, a terminal or a clock lives here, and drives a
//! `guardian_core::Session`.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Agent (JSON over WebSocket)      Backend (JSON over HTTP)
//!         ↕                                ↕
//! [guardian-console]
//!   ├── domain/            ConsoleConfig (TOML file)
//!   ├── application/       Operator commands: parse stdin lines, apply to the session
//!   └── infrastructure/
//!         ├── ws_transport/     WebSocket client (tokio-tungstenite)
//!         ├── http_backend/     REST collaborator (reqwest)
//!         ├── tracing_renderer/ Renderer that writes to the log
//!         └── event_loop/       tokio select loop driving the session
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O other than reading and writing the config file.
//! - `application` depends on `domain` and `guardian-core` only.
//! - `infrastructure` depends on all other layers plus `tokio`,
//!   `tokio-tungstenite` and `reqwest`.

/// Domain layer: console configuration.
pub mod domain;

/// Application layer: operator command parsing and execution.
pub mod application;

/// Infrastructure layer: transport, backend client, renderer, event loop.
pub mod infrastructure;
