//! Database driver contract.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("exec failed: {0}")]
    Exec(String),

    #[error("transaction error: {0}")]
    Transaction(String),
}

/// A pooled connection to the database.
#[async_trait]
pub trait SqlConnection: Send + Sync + 'static {
    async fn begin(&self) -> Result<Box<dyn SqlTransaction>, SqlError>;

    async fn ping(&self) -> Result<(), SqlError>;
}

/// An open transaction. Dropping it without [`SqlTransaction::commit`]
/// rolls it back.
#[async_trait]
pub trait SqlTransaction: Send {
    async fn exec(&mut self, query: &str, args: &[Value]) -> Result<(), SqlError>;

    async fn commit(self: Box<Self>) -> Result<(), SqlError>;
}
