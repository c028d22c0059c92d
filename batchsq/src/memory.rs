use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::time::Instant;

use super::stream::{BatchStream, QueryExecutor};
use super::{Batch, SqError};

/// Executor that answers every query with the same in-memory batches.
#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    batches: Vec<RecordBatch>,
}

impl MemoryExecutor {
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        MemoryExecutor { batches }
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn execute_query(
        &self,
        _sql: &str,
        _deadline: Instant,
    ) -> Result<Box<dyn BatchStream>, SqError> {
        Ok(Box::new(MemoryBatchStream {
            batches: self.batches.iter().cloned().collect(),
        }))
    }
}

#[derive(Debug)]
pub struct MemoryBatchStream {
    batches: VecDeque<RecordBatch>,
}

#[async_trait]
impl BatchStream for MemoryBatchStream {
    fn has_next(&self) -> bool {
        !self.batches.is_empty()
    }

    async fn next_batch(&mut self, _deadline: Instant) -> Result<Batch, SqError> {
        self.batches
            .pop_front()
            .map(Batch::from)
            .ok_or_else(|| SqError::Retrieval("no more batches".to_owned()))
    }
}
