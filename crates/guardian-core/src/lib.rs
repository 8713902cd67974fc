//! # guardian-core
//!
//! Session engine for the Guardian monitoring console.  The console keeps a
//! persistent event stream open to a monitoring agent, routes the typed event
//! messages it receives, keeps a rolling view of detection statistics, and
//! raises short-lived alerts for the operator.
//!
//! This crate has zero dependencies on sockets, HTTP clients, async runtimes,
//! or terminals.  Everything that touches the outside world is a *port*
//! (a trait in [`session::ports`]) that the `guardian-console` crate
//! implements.
//!
//! # Architecture overview
//!
//! - **`protocol`** – The JSON envelopes that travel over the event stream:
//!   inbound event messages (a tagged enum with an explicit `Unknown` case) and
//!   outbound commands.
//!
//! - **`domain`** – Pure state with no timers and no I/O: the bounded
//!   [`EventLog`], the [`StatsAggregator`], alert values, and the data transfer
//!   objects returned by the backend REST collaborators.
//!
//! - **`session`** – The event-driven engine.  A [`Session`] owns the
//!   connection state machine, the message router, the alert presenter, the
//!   command dispatcher, and every timer it schedules.  It is driven by the
//!   caller: transport callbacks, backend results, and clock advances all go
//!   through `&mut Session` on a single logical thread.
//!
//! ```text
//! Transport ─▶ ConnectionManager ─▶ MessageRouter ─▶ EventLog / StatsAggregator / AlertPresenter ─▶ Renderer
//!     ▲
//!     └──────────── CommandDispatcher ◀── operator intent
//! ```

pub mod domain;
pub mod protocol;
pub mod session;

pub use domain::alert::{Alert, AlertId, AlertKind, AlertTtls, TtlPolicy};
pub use domain::backend::{BackendError, BackendReply, BackendRequest};
pub use domain::event_log::{EventLevel, EventLog, EventLogEntry};
pub use domain::stats::{StatsAggregator, StatsSnapshot};
pub use domain::Millis;
pub use protocol::codec::{decode_frame, encode_command, DecodeError, EncodeError};
pub use protocol::commands::Command;
pub use protocol::messages::{InboundMessage, Message};
pub use session::connection::{ConnectionId, ConnectionState, ReconnectPolicy};
pub use session::dispatcher::CommandError;
pub use session::ports::{Renderer, Transport, TransportError};
pub use session::router::MessageRouter;
pub use session::scheduler::{Scheduler, TimerHandle, TimerQueue, TimerTask};
pub use session::{FrameOutcome, PollingConfig, Session, SessionConfig, SessionDiagnostics};
