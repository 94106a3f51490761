//! Logging initialization for relay processes.
//!
//! Thin wrapper over the `observability` package so binaries and tests share
//! one setup path.

pub use observability::LogConfig;

/// Service name written into every log line.
const RELAY_SERVICE_NAME: &str = "relay";

/// Initialize logging for the relay service.
///
/// `level` is the default filter; `RUST_LOG` overrides it.
pub fn init_logging(level: &str) {
    init_logging_for_service(RELAY_SERVICE_NAME, level);
}

/// Initialize logging with a custom service name, e.g. one per backend
/// worker process sharing the central log file.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        also_stderr: true,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
