use arrow::record_batch::RecordBatch;
use std::io::Write;
use std::ops::Deref;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

pub mod config;
pub mod consume;
pub mod databricks;
pub mod format;
pub mod memory;
pub mod render;
pub mod sql;
pub mod stream;

#[derive(Debug, thiserror::Error)]
pub enum SqError {
    #[error("config: {0}")]
    Config(String),
    #[error("execution: {0}")]
    Execution(String),
    #[error("retrieval: {0}")]
    Retrieval(String),
    #[error("timeout: {0} deadline elapsed")]
    Timeout(&'static str),
    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl SqError {
    pub fn execution(e: impl std::fmt::Display) -> Self {
        SqError::Execution(e.to_string())
    }

    pub fn retrieval(e: impl std::fmt::Display) -> Self {
        SqError::Retrieval(e.to_string())
    }
}

pub use config::{Config, Timeouts};
pub use consume::{BatchStreamConsumer, ConsumerState, Summary};
pub use stream::{BatchStream, QueryExecutor};

// dropping a batch releases its buffers
#[derive(Debug)]
pub struct Batch(RecordBatch);

impl Deref for Batch {
    type Target = RecordBatch;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<RecordBatch> for Batch {
    fn from(batch: RecordBatch) -> Self {
        Batch(batch)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        debug!(rows = self.0.num_rows(), "batch released");
    }
}

pub async fn run<E, W>(
    executor: &E,
    sql: &str,
    timeouts: Timeouts,
    sink: W,
) -> Result<Summary, SqError>
where
    E: QueryExecutor + ?Sized,
    W: Write,
{
    sql::validate(sql)?;

    let mut consumer = BatchStreamConsumer::new(sink);

    let deadline = Instant::now() + timeouts.execute;
    info!(timeout = ?timeouts.execute, "executing query");
    let mut batches = timeout_at(deadline, executor.execute_query(sql, deadline))
        .await
        .map_err(|_| SqError::Timeout("query execution"))??;

    let deadline = Instant::now() + timeouts.fetch;
    consumer.consume(batches.as_mut(), deadline).await
}
