use async_trait::async_trait;
use tokio::time::Instant;

use super::{Batch, SqError};

#[async_trait]
pub trait BatchStream: Send {
    fn has_next(&self) -> bool;

    /// Pulls the next batch. May block on I/O, but never past `deadline`.
    async fn next_batch(&mut self, deadline: Instant) -> Result<Batch, SqError>;
}

#[async_trait]
pub trait QueryExecutor: Sync {
    async fn execute_query(
        &self,
        sql: &str,
        deadline: Instant,
    ) -> Result<Box<dyn BatchStream>, SqError>;
}
