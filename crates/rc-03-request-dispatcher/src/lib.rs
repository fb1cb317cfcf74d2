//! # Request Dispatcher
//!
//! Batch dispatch of RPC calls with outcome correlation.
//!
//! ## Outcomes
//!
//! | Outcome shape | Effect |
//! |---------------|--------|
//! | `{result}` | `on_success(result)` |
//! | `{error}` | `on_error(ServerError)` |
//! | `{id}` | envelope tracked as pending under `id` |
//! | missing / `null` | `on_error("No response found")` |
//!
//! Batch-wide failures (transport error, `{error}` reply, malformed reply)
//! reach every envelope's `on_error`.
//!
//! ## Callback Isolation
//!
//! Callbacks return `anyhow::Result<()>`. An `Err` or a panic is reported to
//! the [`DiagnosticSink`](ports::DiagnosticSink) and delivery continues with
//! the next envelope.

#![warn(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{MemoryDiagnostics, ScriptedTransport, SentBatch, TracingDiagnostics};
pub use domain::{
    deliver_error, deliver_status, deliver_success, ClientSession, ErrorCallback, PendingHandlers,
    PendingRequestRegistry, PendingStats, PendingStatsSnapshot, RequestEnvelope, StatusCallback,
    SuccessCallback,
};
pub use ports::{CallbackKind, Diagnostic, DiagnosticSink, RequestTransport};
pub use service::{interpret_reply, DispatchSummary, Outcome, RequestDispatcher};
