//! HTTP client for a running comparison service
//!
//! Used by the `compare` command to fetch per-district raw records from
//! `GET /api/district/{name}`.

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use crate::data::RawRecord;

/// Errors that can occur when talking to the service
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server URL does not parse or cannot carry a path
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed or the body was not a record list
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service has no records for the district
    #[error("No data found for district '{0}'")]
    NotFound(String),

    /// The service answered with another non-success status
    #[error("Service returned status {0}")]
    Status(u16),
}

/// Client for the comparison API
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http_client: Client,
    server: Url,
}

impl DashboardClient {
    /// Creates a client for the service at `server` (e.g. `http://localhost:6001`)
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let server = Url::parse(server).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if server.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(server.to_string()));
        }
        Ok(Self {
            http_client: Client::new(),
            server,
        })
    }

    /// URL of `/api/district/{name}` with the name percent-encoded
    fn district_url(&self, name: &str) -> Result<Url, ClientError> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.server.to_string()))?
            .pop_if_empty()
            .extend(["api", "district", name]);
        Ok(url)
    }

    /// Fetches all raw records for one district
    pub async fn fetch_district(&self, name: &str) -> Result<Vec<RawRecord>, ClientError> {
        let url = self.district_url(name)?;
        let response = self.http_client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<Vec<RawRecord>>().await?),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(name.to_string())),
            status => Err(ClientError::Status(status.as_u16())),
        }
    }
}
