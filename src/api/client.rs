use super::models::{Category, RawBusiness, decode_records};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid record: {0}")]
    Schema(#[from] super::models::SchemaError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Thin client over the directory REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches every business, regardless of status.
    pub async fn fetch_businesses(&self) -> Result<Vec<RawBusiness>, ApiError> {
        let values: Vec<serde_json::Value> = self.get_json("/api/umkms").await?;
        Ok(decode_records(values))
    }

    /// Fetches one business with its nested products.
    pub async fn fetch_business(&self, id: &str) -> Result<RawBusiness, ApiError> {
        self.get_json(&format!("/api/umkms/{id}")).await
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("/api/categories").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "GET");

        let resp = self.http.get(&url).send().await.map_err(classify)?;
        let status = resp.status();

        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = resp.text().await.map_err(classify)?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn classify(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Http(e)
    }
}
