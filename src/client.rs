use crate::session::History;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_GENERATE_PATH: &str = "/-/llm-sql-writer/generate";

/// Body posted to the generation endpoint. `history` already contains the
/// turn carrying `prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub db: String,
    pub table: Option<String>,
    pub prompt: String,
    pub history: History,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{message}")]
    Endpoint { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("failed to build HTTP client: {0}")]
    Setup(String),
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// One attempt, no retry. Returns the generated SQL text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Success needs a 2xx status and a non-empty `sql` string. Anything else is
/// a failure whose message is the body's `error`, the raw body when it is not
/// JSON, or `Error <status>`.
pub fn classify_response(status: u16, body: &str) -> Result<String, GenerationError> {
    let parsed: Value = serde_json::from_str(body).unwrap_or_else(|_| json!({ "error": body }));

    if (200..300).contains(&status) {
        if let Some(sql) = parsed
            .get("sql")
            .and_then(Value::as_str)
            .filter(|sql| !sql.is_empty())
        {
            return Ok(sql.to_string());
        }
    }

    let message = parsed
        .get("error")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Error {status}"));

    Err(GenerationError::Endpoint { status, message })
}

#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpGenerationClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GenerationError::Setup(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        debug!(
            endpoint = %self.endpoint,
            db = %request.db,
            table = request.table.as_deref().unwrap_or("-"),
            turns = request.history.len(),
            "requesting sql generation"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                warn!(endpoint = %self.endpoint, error = %err, "generation request failed");
                GenerationError::Transport(format!("request failed: {err}"))
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| GenerationError::Transport(format!("failed to read response: {err}")))?;

        debug!(status, bytes = body.len(), "generation response received");
        classify_response(status, &body)
    }
}
