use arrow::datatypes::SchemaRef;
use std::fmt;
use std::io::Write;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::format::is_supported;
use crate::render::render_batch;
use crate::stream::BatchStream;
use crate::{Batch, SqError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Fetching,
    Rendering,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total_rows: usize,
    pub batch_count: usize,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NRows: {} in {} batches, took {:?}",
            self.total_rows, self.batch_count, self.elapsed
        )
    }
}

pub struct BatchStreamConsumer<W> {
    sink: W,
    state: ConsumerState,
    started: Instant,
    batch_count: usize,
    total_rows: usize,
    schema: Option<SchemaRef>,
}

impl<W: Write> BatchStreamConsumer<W> {
    pub fn new(sink: W) -> Self {
        BatchStreamConsumer {
            sink,
            state: ConsumerState::Idle,
            started: Instant::now(),
            batch_count: 0,
            total_rows: 0,
            schema: None,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total_rows: self.total_rows,
            batch_count: self.batch_count,
            elapsed: self.started.elapsed(),
        }
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    // batches rendered before a failure stay in the sink
    pub async fn consume(
        &mut self,
        stream: &mut dyn BatchStream,
        deadline: Instant,
    ) -> Result<Summary, SqError> {
        let result = self.drain(stream, deadline).await;
        let summary = self.summary();

        match result {
            Ok(()) => {
                self.state = ConsumerState::Done;
                writeln!(self.sink, "{}", summary)?;
                self.sink.flush()?;
                info!(
                    rows = summary.total_rows,
                    batches = summary.batch_count,
                    elapsed = ?summary.elapsed,
                    "stream finished"
                );
                Ok(summary)
            }
            Err(e) => {
                self.state = ConsumerState::Failed;
                // the stream error wins over a sink error here
                let _ = writeln!(self.sink, "{}", summary).and_then(|_| self.sink.flush());
                error!(
                    error = %e,
                    rows = summary.total_rows,
                    batches = summary.batch_count,
                    elapsed = ?summary.elapsed,
                    "stream failed"
                );
                Err(e)
            }
        }
    }

    async fn drain(&mut self, stream: &mut dyn BatchStream, deadline: Instant) -> Result<(), SqError> {
        while stream.has_next() {
            self.state = ConsumerState::Fetching;
            let batch = timeout_at(deadline, stream.next_batch(deadline))
                .await
                .map_err(|_| SqError::Timeout("batch retrieval"))??;

            self.state = ConsumerState::Rendering;
            self.check_schema(&batch)?;
            info!(batch = self.batch_count, rows = batch.num_rows(), "batch received");

            self.sink.write_all(render_batch(&batch).as_bytes())?;
            self.batch_count += 1;
            self.total_rows += batch.num_rows();
        }
        Ok(())
    }

    fn check_schema(&mut self, batch: &Batch) -> Result<(), SqError> {
        let schema = batch.schema();
        match &self.schema {
            Some(expected) if expected.fields() != schema.fields() => Err(SqError::Retrieval(
                format!("schema changed at batch {}", self.batch_count),
            )),
            Some(_) => Ok(()),
            None => {
                for field in schema.fields().iter().filter(|f| !is_supported(f.data_type())) {
                    warn!(column = %field.name(), data_type = %field.data_type(), "unsupported column type");
                }
                self.schema = Some(schema);
                Ok(())
            }
        }
    }
}
