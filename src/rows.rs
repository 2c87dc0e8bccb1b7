use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Result of running SQL through the data browser's JSON API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryRows {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Error)]
pub enum RowsError {
    #[error("query request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("query failed ({status}): {message}")]
    Query { status: u16, message: String },
}

pub fn query_url(base_url: &str, db: &str) -> String {
    format!("{}/{db}.json", base_url.trim_end_matches('/'))
}

pub async fn fetch_rows(
    http: &reqwest::Client,
    base_url: &str,
    db: &str,
    sql: &str,
) -> Result<QueryRows, RowsError> {
    let url = query_url(base_url, db);
    debug!(%url, "running submitted query");

    let response = http
        .get(&url)
        .query(&[("sql", sql), ("_shape", "arrays")])
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        if let Ok(rows) = serde_json::from_str::<QueryRows>(&body) {
            return Ok(rows);
        }
    }

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Error {}", status.as_u16())
            } else {
                body.trim().to_string()
            }
        });
    Err(RowsError::Query {
        status: status.as_u16(),
        message,
    })
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
