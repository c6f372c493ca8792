pub mod api;
pub mod crawl;
pub mod error;
pub mod locator;
pub mod models;
pub mod retry;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use api::{HN_API_BASE, HnClient};
pub use crawl::{
    CrawlConfig, CrawlEvent, CrawlPhase, CrawlReporter, CrawlService, CrawlSummary,
    TracingCrawlReporter,
};
pub use error::AppError;
pub use locator::ThreadLocator;
pub use models::{FIELD_NAMES, HnItem, ItemKind, JobFields, JobPosting, UpsertOutcome};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use throttle::{RateLimitConfig, RateLimitedFetcher};
pub use traits::{FieldExtractor, Fetcher, JobStore, ThreadResolver};
