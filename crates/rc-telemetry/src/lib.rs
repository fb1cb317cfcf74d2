//! # RC Telemetry
//!
//! Logging setup shared by every binary in the workspace.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RC_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `RC_JSON_LOGS` | `false` | JSON output |
//! | `RC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `RC_SERVICE_NAME` | `schema-rpc-client` | Name in the startup line |

mod config;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_LOG_LEVEL};
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install logging for the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_setup::init_tracing(config)
}
