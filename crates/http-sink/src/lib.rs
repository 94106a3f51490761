//! HTTP sink: every entry becomes one request built by a caller-supplied
//! [`RequestFactory`]. Responses with status 400 and above count as failures.
//!
//! [`HttpPollingSource`] runs the same status check on a polled request and
//! delivers each response body as an entry.

mod config;
mod sink;
mod source;

pub use config::{HttpSinkConfig, HttpSourceConfig};
pub use sink::{HttpSink, HttpSinkError, RequestFactory};
pub use source::{HttpPollingSource, PollRequestFactory};
