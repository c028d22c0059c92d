use batchsq::databricks::DatabricksExecutor;
use batchsq::{Config, SqError};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SqError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let executor = DatabricksExecutor::new(&config)?;

    match batchsq::run(&executor, &config.query, config.timeouts(), std::io::stdout()).await {
        Ok(summary) => {
            info!(rows = summary.total_rows, elapsed = ?summary.elapsed, "done");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "query failed");
            Err(e)
        }
    }
}
