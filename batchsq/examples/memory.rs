// render a couple of in-memory batches through the same pipeline

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use batchsq::memory::MemoryExecutor;
use batchsq::{SqError, Timeouts};
use std::sync::Arc;

fn trips(first_id: i64, fares: Vec<Option<f64>>) -> Result<RecordBatch, SqError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("fare", DataType::Float64, true),
        Field::new("zone", DataType::Utf8, true),
        Field::new("pickup", DataType::Timestamp(TimeUnit::Microsecond, None), true),
    ]));
    let n = fares.len() as i64;
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from((first_id..first_id + n).collect::<Vec<_>>())) as ArrayRef,
            Arc::new(Float64Array::from(fares)),
            Arc::new(StringArray::from_iter((0..n).map(|i| Some(format!("zone-{}", i % 3))))),
            Arc::new(TimestampMicrosecondArray::from_iter_values(
                (0..n).map(|i| 1_420_167_845_000_000 + i * 60_000_000),
            )),
        ],
    )?;
    Ok(batch)
}

#[tokio::main]
async fn main() -> Result<(), SqError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let executor = MemoryExecutor::new(vec![
        trips(1, vec![Some(12.5), None, Some(7.25)])?,
        trips(4, vec![Some(30.0)])?,
    ]);
    let summary = batchsq::run(
        &executor,
        "SELECT * FROM samples.nyctaxi.trips",
        Timeouts::default(),
        std::io::stdout(),
    )
    .await?;
    tracing::info!(rows = summary.total_rows, "done");
    Ok(())
}
