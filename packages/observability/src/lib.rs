//! # Observability
//!
//! Centralized tracing setup for entry-relay services.
//!
//! Services call [`init`] (or [`init_with_config`]) once at startup and then
//! use the standard `tracing` macros. Components never hold a logger object
//! of their own; they receive a `tracing::Span` from whoever constructs them
//! and emit events inside it.
//!
//! With the default `file` feature every event is appended as one JSON line
//! to `~/.entry-relay/logs/relay.jsonl`, which can be followed with
//! `tail -f ~/.entry-relay/logs/relay.jsonl | jq`.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "relay".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("relay started");
//! }
//! ```

#[cfg(feature = "file")]
mod file;

mod json_layer;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every log line.
    pub service_name: String,

    /// Default filter directive (e.g. "info", "retriable_write_coordinator=debug").
    /// Overridden by `RUST_LOG` when set.
    pub default_level: String,

    /// Custom log file path. Defaults to `~/.entry-relay/logs/relay.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize the observability layer with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// Installing a global subscriber twice is a no-op: the second call keeps the
/// subscriber that is already in place.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "file")]
    {
        file::init_file_subscriber(&config);
    }

    #[cfg(not(feature = "file"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(&config.default_level))
            .with_target(true)
            .compact()
            .finish()
            .try_init();
    }
}

/// Builds the filter from `RUST_LOG`, falling back to `default_level`.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export the span macro for structured context.
pub use tracing::span;

/// Re-export Level for advanced filtering.
pub use tracing::Level;
