//! # Adapters
//!
//! Diagnostic sinks and an in-memory request transport.

pub mod diagnostics;
pub mod transport;

pub use diagnostics::{MemoryDiagnostics, TracingDiagnostics};
pub use transport::{ScriptedTransport, SentBatch};
