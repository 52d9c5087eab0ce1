//! MSL Telemetry - logging setup for trust-management entities.
//!
//! The trust crates only emit `tracing` events. This crate installs the
//! subscriber that decides where they go:
//! - pretty, compact, JSON or full formats
//! - stdout, stderr or daily log files
//! - `EnvFilter` level and per-crate directives
//!
//! With the `config` feature, a [`LogConfig`] can be built from the
//! `[logging]` section of an entity's configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use msl_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), msl_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("msl_store=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!(entity_id = "client-1", "Trust store opened");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
