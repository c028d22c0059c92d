use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

use super::SqError;

pub const DEFAULT_QUERY: &str = "SELECT * FROM samples.nyctaxi.trips";

/// Run a SQL query against a Databricks SQL warehouse and print the result
/// batches as tables.
#[derive(Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// SQL text to execute
    #[arg(default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Workspace host name, with or without https://
    #[arg(long, env = "DATABRICKS_HOST", default_value = "")]
    pub host: String,

    #[arg(long, env = "DATABRICKS_PORT", default_value_t = 443)]
    pub port: u16,

    /// HTTP path of the warehouse, e.g. /sql/1.0/warehouses/abc123
    #[arg(long, env = "DATABRICKS_HTTP_PATH", default_value = "")]
    pub http_path: String,

    #[arg(long, env = "DATABRICKS_ACCESS_TOKEN", hide_env_values = true, default_value = "")]
    pub access_token: String,

    /// Upper bound on rows the warehouse returns
    #[arg(long, env = "BATCHSQ_MAX_ROWS", default_value_t = 100_000)]
    pub max_rows: u64,

    /// Seconds allowed for query submission and execution
    #[arg(long, env = "BATCHSQ_EXECUTE_TIMEOUT", default_value_t = 60)]
    pub execute_timeout: u64,

    /// Seconds allowed for retrieving all result batches
    #[arg(long, env = "BATCHSQ_FETCH_TIMEOUT", default_value_t = 60)]
    pub fetch_timeout: u64,
}

/// The two bounded windows of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub execute: Duration,
    pub fetch: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            execute: Duration::from_secs(60),
            fetch: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            execute: Duration::from_secs(self.execute_timeout),
            fetch: Duration::from_secs(self.fetch_timeout),
        }
    }

    /// `https://host:port` with any scheme or trailing slash in `host` dropped.
    pub fn base_url(&self) -> String {
        let host = self.host.trim();
        let host = host
            .strip_prefix("https://")
            .or_else(|| host.strip_prefix("http://"))
            .unwrap_or(host)
            .trim_end_matches('/');
        format!("https://{}:{}", host, self.port)
    }

    /// The warehouse id at the end of the HTTP path.
    pub fn warehouse_id(&self) -> Result<String, SqError> {
        lazy_static! {
            static ref PAT: Regex =
                Regex::new(r"^/?sql/[\d.]+/(?:warehouses|endpoints)/([A-Za-z0-9]+)/?$").unwrap();
        }

        PAT.captures(self.http_path.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
            .ok_or_else(|| {
                SqError::Config(format!("no warehouse id in http path {:?}", self.http_path))
            })
    }

    pub fn validate(&self) -> Result<(), SqError> {
        if self.host.trim().is_empty() {
            return Err(SqError::Config("DATABRICKS_HOST is not set".to_owned()));
        }
        if self.access_token.trim().is_empty() {
            return Err(SqError::Config("DATABRICKS_ACCESS_TOKEN is not set".to_owned()));
        }
        if self.max_rows == 0 {
            return Err(SqError::Config("max rows must be positive".to_owned()));
        }
        self.warehouse_id().map(|_| ())
    }
}
