//! Core types shared by every entry-relay sink and source.
//!
//! - [`Entry`] / [`Outcome`]: the unit of data and the unit of result.
//! - [`BatchError`]: per-key failures of one batch, destructurable by key.
//! - [`Sink`] / [`Source`]: the two capability contracts backends implement.
//! - [`RelayConfig`] and [`init_logging`]: the ambient configuration and
//!   logging bootstrap.

mod batch_error;
mod capability;
mod config;
mod entry;
mod error;
mod logging;

pub use batch_error::BatchError;
pub use capability::{Sink, Source};
pub use config::{CoordinatorSettings, RelayConfig, DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV};
pub use entry::{entry_key, Entry, KeyExtractor, Outcome};
pub use error::{
    BoxError, CoreError, CoreResult, EntryError, SinkError, SinkResult, SourceError, SourceResult,
};
pub use logging::{init_logging, init_logging_for_service, parse_level};
