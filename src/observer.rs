use crate::types::{MinerInfo, PoolInfo};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("miner address cannot be empty")]
    EmptyAddress,
    #[error("invalid observer base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("could not connect to the observer API: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("observer API returned status {0}")]
    Status(StatusCode),
    #[error("invalid JSON from the observer API: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ObserverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ObserverError::Timeout
        } else if err.is_connect() {
            ObserverError::Connect(err)
        } else {
            ObserverError::Request(err)
        }
    }
}

/// Client for the P2Pool observer REST API
#[derive(Clone)]
pub struct ObserverClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ObserverClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ObserverError> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|_| ObserverError::InvalidBaseUrl(base_url.into()))?;
        if base_url.cannot_be_a_base() {
            return Err(ObserverError::InvalidBaseUrl(base_url.into()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Current pool and sidechain state
    pub async fn pool_info(&self) -> Result<PoolInfo, ObserverError> {
        let url = self.endpoint(&["pool_info"])?;
        self.get_json(url).await
    }

    /// Miner statistics; `Ok(None)` when the pool doesn't know the address
    pub async fn miner_info(&self, address: &str) -> Result<Option<MinerInfo>, ObserverError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ObserverError::EmptyAddress);
        }

        let url = self.endpoint(&["miner_info", address])?;
        match self.get_json::<Option<MinerInfo>>(url).await {
            Ok(info) => Ok(info.filter(|i| !i.is_empty())),
            Err(ObserverError::Status(StatusCode::NOT_FOUND)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ObserverError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ObserverError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ObserverError> {
        tracing::debug!(%url, "fetching from observer");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ObserverError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
