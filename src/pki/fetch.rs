use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;
use tracing::debug;

use super::errors::{CheckResult, RevocationError};

/// Body and status of an HTTP exchange.
///
/// Non-success statuses are returned as data, only transport failures are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used to retrieve CRLs, issuer certificates and OCSP answers.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str) -> CheckResult<FetchResponse>;

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> CheckResult<FetchResponse>;
}

/// `reqwest` backed fetcher
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl ReqwestFetcher {
    /// Returns an error if the HTTP client cannot be initialized
    pub fn new(timeout_secs: u64, max_body_bytes: usize) -> CheckResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            request_timeout: Duration::from_secs(timeout_secs),
            max_body_bytes,
        })
    }

    async fn read(&self, url: &str, response: reqwest::Response) -> CheckResult<FetchResponse> {
        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.max_body_bytes
        {
            return Err(RevocationError::Fetch(format!(
                "response from {url} is {len} bytes, limit is {}",
                self.max_body_bytes
            )));
        }

        let body = response.bytes().await?;
        if body.len() > self.max_body_bytes {
            return Err(RevocationError::Fetch(format!(
                "response from {url} is {} bytes, limit is {}",
                body.len(),
                self.max_body_bytes
            )));
        }

        debug!("Fetched {} bytes from {} (HTTP {})", body.len(), url, status);
        Ok(FetchResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> CheckResult<FetchResponse> {
        let response = match timeout(self.request_timeout, self.client.get(url).send()).await {
            Ok(result) => result?,
            Err(_) => return Err(RevocationError::Timeout(url.to_string())),
        };

        self.read(url, response).await
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> CheckResult<FetchResponse> {
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);

        let response = match timeout(self.request_timeout, request.send()).await {
            Ok(result) => result?,
            Err(_) => return Err(RevocationError::Timeout(url.to_string())),
        };

        self.read(url, response).await
    }
}
