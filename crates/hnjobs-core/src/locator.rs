//! Discovery of the monthly "Ask HN: Who is hiring?" thread.
//!
//! Looks through the current Ask HN listing first. If the thread has
//! already dropped off it, walks item ids backward from `maxitem` up to a
//! configurable bound.

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::api::HnClient;
use crate::error::AppError;
use crate::models::HnItem;
use crate::traits::{Fetcher, ThreadResolver};

/// Default number of ids examined by the backward scan.
pub const DEFAULT_BACKWARD_SCAN_LIMIT: u64 = 20_000;
/// Default pause between backward-scan requests.
pub const DEFAULT_SCAN_PAUSE: Duration = Duration::from_millis(100);

/// Title matcher for a given month, e.g. "Ask HN: Who is hiring? (May 2025)".
pub fn hiring_title_pattern(now: DateTime<Utc>) -> Result<Regex, AppError> {
    let month_year = now.format("%B %Y").to_string();
    Regex::new(&format!(
        r"(?i)ask hn:\s*who is hiring\??\s*\({}\)",
        regex::escape(&month_year)
    ))
    .map_err(|e| AppError::Generic(format!("Invalid title pattern: {e}")))
}

/// Finds the id of the current hiring thread.
#[derive(Clone)]
pub struct ThreadLocator<F> {
    client: HnClient<F>,
    backward_scan_limit: u64,
    scan_pause: Duration,
}

impl<F: Fetcher> ThreadLocator<F> {
    pub fn new(client: HnClient<F>) -> Self {
        Self {
            client,
            backward_scan_limit: DEFAULT_BACKWARD_SCAN_LIMIT,
            scan_pause: DEFAULT_SCAN_PAUSE,
        }
    }

    pub fn with_backward_scan_limit(mut self, limit: u64) -> Self {
        self.backward_scan_limit = limit;
        self
    }

    pub fn with_scan_pause(mut self, pause: Duration) -> Self {
        self.scan_pause = pause;
        self
    }

    /// Locate the hiring thread for the month containing `now`.
    ///
    /// Failing to read the listings is fatal. Individual items that fail
    /// to load are skipped. Returns [`AppError::ThreadNotFound`] when no
    /// title matches.
    pub async fn find(&self, now: DateTime<Utc>) -> Result<HnItem, AppError> {
        let pattern = hiring_title_pattern(now)?;

        for id in self.client.ask_stories().await? {
            match self.client.item(id).await {
                Ok(Some(item)) if title_matches(&item, &pattern) => {
                    tracing::info!(id, title = ?item.title, "Found hiring thread in askstories");
                    return Ok(item);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(id, error = %e, "Error fetching Ask HN item"),
            }
        }

        tracing::info!("Not found in askstories, scanning back from maxitem");
        let max_id = self.client.max_item().await?;
        let floor = max_id.saturating_sub(self.backward_scan_limit);

        for id in (floor + 1..=max_id).rev() {
            if id % 100 == 0 {
                tracing::info!(id, "Checking item");
            }
            tokio::time::sleep(self.scan_pause).await;

            match self.client.item(id).await {
                Ok(Some(item)) if item.is_story() && title_matches(&item, &pattern) => {
                    tracing::info!(id, title = ?item.title, "Found hiring thread by maxitem scan");
                    return Ok(item);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(id, error = %e, "Skipping item"),
            }
        }

        Err(AppError::ThreadNotFound(now.format("%B %Y").to_string()))
    }
}

impl<F: Fetcher> ThreadResolver for ThreadLocator<F> {
    async fn resolve(&self) -> Result<u64, AppError> {
        self.find(Utc::now()).await.map(|item| item.id)
    }
}

fn title_matches(item: &HnItem, pattern: &Regex) -> bool {
    item.title.as_deref().is_some_and(|t| pattern.is_match(t))
}
