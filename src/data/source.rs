//! data.gov.in record source
//!
//! Fetches one page of raw MGNREGA district records from the Open Government
//! Data platform. There is no pagination: callers get at most `limit` records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::RawRecord;

/// Default data.gov.in resource holding district-wise MGNREGA records
pub const DEFAULT_BASE_URL: &str =
    "https://api.data.gov.in/resource/ee03643a-ee4c-48c2-ac30-9f2ff26ab722";

/// Default number of records requested per fetch
pub const DEFAULT_RECORD_LIMIT: usize = 1000;

/// Errors that make the upstream source unavailable
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network error or undecodable body
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Body parsed as JSON but does not have the expected shape
    #[error("Malformed upstream payload: {0}")]
    Malformed(String),
}

/// Anything that can produce a batch of raw records
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError>;
}

/// Response envelope from the data.gov.in API
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    records: Option<Value>,
}

/// Client for the data.gov.in resource API
#[derive(Debug, Clone)]
pub struct DataGovClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    limit: usize,
}

impl DataGovClient {
    /// Creates a client for the default resource
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client for a custom resource URL
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            limit: DEFAULT_RECORD_LIMIT,
        }
    }

    /// Sets the number of records requested per fetch
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bounds each upstream request by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SourceError> {
        self.http_client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Extracts the record list from a decoded response body
    fn parse_body(body: Value) -> Result<Vec<RawRecord>, SourceError> {
        if !body.is_object() {
            return Err(SourceError::Malformed(
                "response body is not a JSON object".to_string(),
            ));
        }

        let response: ApiResponse = serde_json::from_value(body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        match response.records {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(SourceError::Malformed(format!(
                        "record {} is not an object: {}",
                        i, other
                    ))),
                })
                .collect(),
            Some(other) => Err(SourceError::Malformed(format!(
                "`records` is not an array: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl RecordSource for DataGovClient {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let limit = self.limit.to_string();
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("api-key", self.api_key.as_str()),
                ("format", "json"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.json::<Value>().await?;
        let records = Self::parse_body(body)?;

        tracing::debug!(count = records.len(), "Fetched upstream records");
        Ok(records)
    }
}
