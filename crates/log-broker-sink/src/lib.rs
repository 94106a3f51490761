//! Log-broker sink.
//!
//! Serialises entries into keyed messages and hands them to a
//! [`LogWriter`]. Every produce call is retried with linear backoff and
//! bounded by the configured write timeout.

mod config;
mod sink;
mod writer;

pub use config::LogBrokerSinkConfig;
pub use sink::{bytes_serializer, json_serializer, LogBrokerSink, Serializer};
pub use writer::{BrokerError, LogWriter, Message};
