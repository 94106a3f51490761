//! Columnar SQL sink.
//!
//! Each entry carries one positional row; rows are inserted with a single
//! generated `INSERT` statement inside a transaction. Batches commit only
//! when every row was accepted.

mod config;
mod connection;
mod query;
mod sink;

pub use config::ColumnarConfig;
pub use connection::{SqlConnection, SqlError, SqlTransaction};
pub use query::{gen_insert_query, gen_placeholders, Record, RecordMapping};
pub use sink::ColumnarSink;
