use url::Url;

use crate::error::AppError;
use crate::models::HnItem;
use crate::traits::Fetcher;

/// Base URL of the public Hacker News Firebase API.
pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Typed access to the Hacker News read API on top of any [`Fetcher`].
#[derive(Clone)]
pub struct HnClient<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetcher> HnClient<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            base_url: HN_API_BASE.to_string(),
        }
    }

    /// Point the client at another API root (mirrors, test servers).
    pub fn with_base_url(fetcher: F, base_url: &str) -> Result<Self, AppError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid API base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "API base URL '{base_url}' must use http or https"
            )));
        }

        Ok(Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn item_url(&self, id: u64) -> String {
        format!("{}/item/{id}.json", self.base_url)
    }

    /// The newest item id.
    pub async fn max_item(&self) -> Result<u64, AppError> {
        let value = self
            .fetcher
            .fetch(&format!("{}/maxitem.json", self.base_url))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ids of the current job stories, newest first.
    pub async fn job_stories(&self) -> Result<Vec<u64>, AppError> {
        self.id_list("jobstories").await
    }

    /// Ids of the current "Ask HN" stories.
    pub async fn ask_stories(&self) -> Result<Vec<u64>, AppError> {
        self.id_list("askstories").await
    }

    /// Fetch one item. The API answers `null` for ids that do not exist.
    pub async fn item(&self, id: u64) -> Result<Option<HnItem>, AppError> {
        let value = self.fetcher.fetch(&self.item_url(id)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn id_list(&self, name: &str) -> Result<Vec<u64>, AppError> {
        let value = self
            .fetcher
            .fetch(&format!("{}/{name}.json", self.base_url))
            .await?;
        let ids: Option<Vec<u64>> = serde_json::from_value(value)?;
        Ok(ids.unwrap_or_default())
    }
}
