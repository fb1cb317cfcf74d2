//! # Client Runtime
//!
//! Wires the client subsystems together.
//!
//! ```text
//!            ┌──────────────┐  send_batch   ┌──────────────────┐
//! caller ──→ │  RpcClient   │ ────────────→ │ RequestTransport │
//!            │              │               └──────────────────┘
//!            │  dispatcher ─┼─ {id} ──→ ClientSession.pending
//!            │  tracker    ←┼─ ChannelEvent stream ←── PushTransport
//!            └──────────────┘
//! ```
//!
//! - `config/` - `ClientConfig` loaded from JSON or environment
//! - `client/` - `RpcClient` facade and builder
//!
//! The `schema-check` binary loads a schema document, verifies it, and can
//! validate one call's params against it.

pub mod client;
pub mod config;

pub use client::{RpcClient, RpcClientBuilder};
pub use config::{
    ChannelConfig, ClientConfig, ConfigError, ReconciliationConfig, ValidationConfig,
};
