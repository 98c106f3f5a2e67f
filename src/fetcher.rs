use serde::de::DeserializeOwned;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use url::Url;

use crate::config::ScraperConfig;
use crate::utils::error::{AppError, ScanError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    PostForm(Vec<(String, String)>),
}

/// One outbound request issued by a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub method: FetchMethod,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: FetchMethod::Get,
            headers: Vec::new(),
        }
    }

    pub fn post_form(url: Url, fields: Vec<(String, String)>) -> Self {
        Self {
            url,
            method: FetchMethod::PostForm(fields),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Shared HTTP client for all scanners.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl HttpFetcher {
    pub fn new(config: ScraperConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch the response body as text.
    ///
    /// Transient failures are retried `retry_attempts` times; a non-2xx
    /// status is a fetch failure.
    pub async fn fetch_text(&self, request: &FetchRequest) -> Result<String, ScanError> {
        let strategy = FixedInterval::from_millis(self.config.retry_delay_ms)
            .take(self.config.retry_attempts as usize);

        RetryIf::start(
            strategy,
            || self.send_once(request),
            |err: &ScanError| {
                if err.is_transient() {
                    tracing::debug!(url = %request.url, error = %err, "retrying request");
                }
                err.is_transient()
            },
        )
        .await
    }

    /// Fetch and decode a JSON body. A body that does not decode is a
    /// parse failure, not a fetch failure.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &FetchRequest) -> Result<T, ScanError> {
        let body = self.fetch_text(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            ScanError::parse(format!("invalid JSON from {}: {}", request.url, e))
        })
    }

    async fn send_once(&self, request: &FetchRequest) -> Result<String, ScanError> {
        let url = request.url.as_str();

        let mut builder = match &request.method {
            FetchMethod::Get => self.client.get(request.url.clone()),
            FetchMethod::PostForm(fields) => self.client.post(request.url.clone()).form(fields),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ScanError::from_http(url, e))?
            .error_for_status()
            .map_err(|e| ScanError::from_http(url, e))?;

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::from_http(url, e))?;

        tracing::trace!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}
