use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{JobFields, UpsertOutcome};

/// Fetches a JSON document from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<serde_json::Value, AppError>> + Send;
}

/// Turns the raw HTML text of a post into the fixed field set.
///
/// Implementations must not fail the crawl: irrecoverable output degrades
/// to [`JobFields::empty`]. The `Result` carries only errors the caller
/// should log and skip the item for.
pub trait FieldExtractor: Send + Sync + Clone {
    fn extract(&self, text: &str) -> impl Future<Output = Result<JobFields, AppError>> + Send;

    /// Short label used in logs ("heuristic", the model name, ...).
    fn name(&self) -> &str;
}

/// Persists extracted job postings keyed by source item id.
pub trait JobStore: Send + Sync + Clone {
    /// Insert or fully overwrite the posting for `external_id`.
    ///
    /// Returns [`UpsertOutcome::Skipped`] without writing when `fields`
    /// has no content.
    fn upsert(
        &self,
        external_id: i64,
        fields: &JobFields,
        posted_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<UpsertOutcome, AppError>> + Send;
}

/// Resolves the crawl target when no thread id was supplied.
pub trait ThreadResolver: Send + Sync {
    fn resolve(&self) -> impl Future<Output = Result<u64, AppError>> + Send;
}
