use std::time::Duration;

use hnjobs_core::error::AppError;
use hnjobs_core::traits::Fetcher;
use reqwest::Client;

const USER_AGENT: &str = "hnjobs/0.1 (+https://news.ycombinator.com/jobs)";

/// HTTP fetcher using reqwest.
///
/// Downloads one JSON document per call and classifies failures so the
/// retry layer can tell transient errors from permanent ones.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else if e.is_request() || e.is_body() {
                // Connection dropped or reset after it was established.
                AppError::NetworkError(format!("Request failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            return Err(match code {
                500 | 502 | 503 | 504 => AppError::UpstreamStatus {
                    status: code,
                    url: url.to_string(),
                },
                _ => AppError::HttpError(format!("HTTP {code} for {url}")),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::NetworkError(format!("Failed to read response body: {e}"))
            }
        })?;

        Ok(serde_json::from_str(&body)?)
    }
}
