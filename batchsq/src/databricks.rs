//! Query execution over the Databricks SQL Statement Execution API.
//!
//! A statement is submitted with the `ARROW_STREAM` format and the
//! `EXTERNAL_LINKS` disposition. The warehouse then serves the result as
//! numbered chunks, each an Arrow IPC stream behind a presigned URL, which
//! [`DatabricksBatchStream`] downloads and decodes one at a time.

use arrow::datatypes::SchemaRef;
use arrow::ipc::reader::StreamReader;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::Config;
use super::stream::{BatchStream, QueryExecutor};
use super::{Batch, SqError};

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
// the service accepts 0s or 5s..=50s
const WAIT_TIMEOUT: &str = "30s";

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: &'a str,
    on_wait_timeout: &'a str,
    format: &'a str,
    disposition: &'a str,
    row_limit: u64,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<ResultManifest>,
    #[serde(default)]
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: StatementState,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultManifest {
    #[serde(default)]
    total_chunk_count: usize,
    #[serde(default)]
    total_row_count: Option<u64>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ResultData {
    #[serde(default)]
    external_links: Vec<ExternalLink>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExternalLink {
    chunk_index: usize,
    external_link: String,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl StatementStatus {
    fn failure(&self) -> SqError {
        let detail = self
            .error
            .as_ref()
            .map(|e| {
                format!(
                    "{}: {}",
                    e.error_code.as_deref().unwrap_or("UNKNOWN"),
                    e.message.as_deref().unwrap_or("no message")
                )
            })
            .unwrap_or_else(|| "no details".to_owned());
        SqError::Execution(format!("statement {:?}: {}", self.state, detail))
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

#[derive(Debug, Clone)]
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn statement(&self, id: &str, deadline: Instant) -> Result<StatementResponse, reqwest::Error> {
        self.client
            .get(self.url(&format!("{}/{}", STATEMENTS_PATH, id)))
            .bearer_auth(&self.token)
            .timeout(remaining(deadline))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn chunk(&self, id: &str, index: usize, deadline: Instant) -> Result<ResultData, reqwest::Error> {
        self.client
            .get(self.url(&format!("{}/{}/result/chunks/{}", STATEMENTS_PATH, id, index)))
            .bearer_auth(&self.token)
            .timeout(remaining(deadline))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Presigned links must not carry the workspace token.
    async fn download(&self, link: &ExternalLink, deadline: Instant) -> Result<Vec<u8>, reqwest::Error> {
        let mut req = self.client.get(&link.external_link).timeout(remaining(deadline));
        for (name, value) in &link.http_headers {
            req = req.header(name.as_str(), value.as_str());
        }
        Ok(req.send().await?.error_for_status()?.bytes().await?.to_vec())
    }
}

#[derive(Debug)]
pub struct DatabricksExecutor {
    endpoint: Endpoint,
    warehouse_id: String,
    max_rows: u64,
}

impl DatabricksExecutor {
    pub fn new(config: &Config) -> Result<Self, SqError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SqError::Config(e.to_string()))?;

        Ok(DatabricksExecutor {
            endpoint: Endpoint {
                client,
                base_url: config.base_url(),
                token: config.access_token.clone(),
            },
            warehouse_id: config.warehouse_id()?,
            max_rows: config.max_rows,
        })
    }

    async fn submit(&self, sql: &str, deadline: Instant) -> Result<StatementResponse, reqwest::Error> {
        let body = StatementRequest {
            statement: sql,
            warehouse_id: &self.warehouse_id,
            wait_timeout: WAIT_TIMEOUT,
            on_wait_timeout: "CONTINUE",
            format: "ARROW_STREAM",
            disposition: "EXTERNAL_LINKS",
            row_limit: self.max_rows,
        };
        self.endpoint
            .client
            .post(self.endpoint.url(STATEMENTS_PATH))
            .bearer_auth(&self.endpoint.token)
            .timeout(remaining(deadline))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl QueryExecutor for DatabricksExecutor {
    async fn execute_query(
        &self,
        sql: &str,
        deadline: Instant,
    ) -> Result<Box<dyn BatchStream>, SqError> {
        let mut resp = self.submit(sql, deadline).await.map_err(SqError::execution)?;
        info!(statement = %resp.statement_id, state = ?resp.status.state, "statement submitted");

        while matches!(resp.status.state, StatementState::Pending | StatementState::Running) {
            tokio::time::sleep(POLL_INTERVAL.min(remaining(deadline))).await;
            resp = self
                .endpoint
                .statement(&resp.statement_id, deadline)
                .await
                .map_err(SqError::execution)?;
            debug!(statement = %resp.statement_id, state = ?resp.status.state, "polled statement");
        }

        if resp.status.state != StatementState::Succeeded {
            return Err(resp.status.failure());
        }

        Ok(Box::new(DatabricksBatchStream::new(self.endpoint.clone(), resp)))
    }
}

/// Result chunks of one succeeded statement, pulled in chunk order.
#[derive(Debug)]
pub struct DatabricksBatchStream {
    endpoint: Endpoint,
    statement_id: String,
    total_chunks: usize,
    next_chunk: usize,
    links: HashMap<usize, ExternalLink>,
    pending: VecDeque<RecordBatch>,
}

impl DatabricksBatchStream {
    fn new(endpoint: Endpoint, resp: StatementResponse) -> Self {
        let manifest = resp.manifest.unwrap_or(ResultManifest {
            total_chunk_count: 0,
            total_row_count: None,
            truncated: false,
        });
        if manifest.truncated {
            warn!(rows = ?manifest.total_row_count, "result truncated at the row limit");
        }
        info!(
            statement = %resp.statement_id,
            chunks = manifest.total_chunk_count,
            rows = ?manifest.total_row_count,
            "statement succeeded"
        );

        let links = resp
            .result
            .unwrap_or_default()
            .external_links
            .into_iter()
            .map(|l| (l.chunk_index, l))
            .collect();

        DatabricksBatchStream {
            endpoint,
            statement_id: resp.statement_id,
            total_chunks: manifest.total_chunk_count,
            next_chunk: 0,
            links,
            pending: VecDeque::new(),
        }
    }

    async fn link(&mut self, index: usize, deadline: Instant) -> Result<ExternalLink, SqError> {
        if let Some(link) = self.links.remove(&index) {
            return Ok(link);
        }
        let data = self
            .endpoint
            .chunk(&self.statement_id, index, deadline)
            .await
            .map_err(SqError::retrieval)?;
        for link in data.external_links {
            self.links.insert(link.chunk_index, link);
        }
        self.links
            .remove(&index)
            .ok_or_else(|| SqError::Retrieval(format!("no link for chunk {}", index)))
    }

    async fn fetch_chunk(&mut self, index: usize, deadline: Instant) -> Result<(), SqError> {
        let link = self.link(index, deadline).await?;
        let bytes = self
            .endpoint
            .download(&link, deadline)
            .await
            .map_err(SqError::retrieval)?;
        debug!(chunk = index, bytes = bytes.len(), "downloaded chunk");

        let (schema, batches) = decode_chunk(bytes)?;
        if batches.is_empty() {
            self.pending.push_back(RecordBatch::new_empty(schema));
        } else {
            self.pending.extend(batches);
        }
        Ok(())
    }
}

fn decode_chunk(bytes: Vec<u8>) -> Result<(SchemaRef, Vec<RecordBatch>), SqError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}

#[async_trait]
impl BatchStream for DatabricksBatchStream {
    fn has_next(&self) -> bool {
        !self.pending.is_empty() || self.next_chunk < self.total_chunks
    }

    async fn next_batch(&mut self, deadline: Instant) -> Result<Batch, SqError> {
        if self.pending.is_empty() {
            if self.next_chunk >= self.total_chunks {
                return Err(SqError::Retrieval("result exhausted".to_owned()));
            }
            let index = self.next_chunk;
            self.fetch_chunk(index, deadline).await?;
            self.next_chunk += 1;
        }
        self.pending
            .pop_front()
            .map(Batch::from)
            .ok_or_else(|| SqError::Retrieval("empty chunk".to_owned()))
    }
}
