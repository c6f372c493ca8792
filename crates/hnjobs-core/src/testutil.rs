//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{HnItem, JobFields, JobPosting, UpsertOutcome};
use crate::traits::{FieldExtractor, Fetcher, JobStore};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher routing by exact URL.
///
/// Queued responses for a URL are consumed first, then the fixed response
/// (if any) is returned on every call. Unrouted URLs answer `null`, the
/// same thing the HN API does for unknown items.
#[derive(Clone, Default)]
pub struct MockFetcher {
    queued: Arc<Mutex<HashMap<String, VecDeque<Result<serde_json::Value, AppError>>>>>,
    fixed: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    calls: Arc<Mutex<Vec<String>>>,
    latency: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `value` for `url` once queued responses are used up.
    pub fn with_json(self, url: &str, value: serde_json::Value) -> Self {
        self.fixed.lock().unwrap().insert(url.to_string(), value);
        self
    }

    /// Queue one error for `url`.
    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Err(error));
        self
    }

    /// Serve `item` at `{base}/item/{id}.json`.
    pub fn with_item(self, base: &str, item: &HnItem) -> Self {
        let value = serde_json::to_value(item).unwrap();
        self.with_json(&format!("{base}/item/{}.json", item.id), value)
    }

    /// Sleep this long inside every call before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(queue) = self.queued.lock().unwrap().get_mut(url) {
            if let Some(response) = queue.pop_front() {
                return response;
            }
        }
        Ok(self
            .fixed
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor keyed by input text.
///
/// Unknown inputs are echoed back as the `description`, so every non-empty
/// post produces a record with content.
#[derive(Clone, Default)]
pub struct MockExtractor {
    responses: Arc<Mutex<HashMap<String, VecDeque<Result<JobFields, AppError>>>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(self, text: &str, fields: JobFields) -> Self {
        self.push(text, Ok(fields));
        self
    }

    pub fn with_error(self, text: &str, error: AppError) -> Self {
        self.push(text, Err(error));
        self
    }

    fn push(&self, text: &str, response: Result<JobFields, AppError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .push_back(response);
    }
}

impl FieldExtractor for MockExtractor {
    async fn extract(&self, text: &str) -> Result<JobFields, AppError> {
        self.calls.lock().unwrap().push(text.to_string());

        if let Some(queue) = self.responses.lock().unwrap().get_mut(text) {
            if let Some(response) = queue.pop_front() {
                return response;
            }
        }
        Ok(JobFields {
            description: Some(text.to_string()),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store with the same upsert semantics as the Postgres one.
#[derive(Clone, Default)]
pub struct MockStore {
    pub rows: Arc<Mutex<HashMap<i64, JobPosting>>>,
    /// Ids in the order they were written (inserts and updates).
    pub writes: Arc<Mutex<Vec<i64>>>,
    upsert_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store whose next upsert fails with `error`.
    pub fn with_upsert_error(error: AppError) -> Self {
        let store = Self::default();
        *store.upsert_error.lock().unwrap() = Some(error);
        store
    }

    pub fn get(&self, external_id: i64) -> Option<JobPosting> {
        self.rows.lock().unwrap().get(&external_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl JobStore for MockStore {
    async fn upsert(
        &self,
        external_id: i64,
        fields: &JobFields,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<UpsertOutcome, AppError> {
        if let Some(e) = self.upsert_error.lock().unwrap().take() {
            return Err(e);
        }
        if !fields.has_content() {
            return Ok(UpsertOutcome::Skipped);
        }

        let mut rows = self.rows.lock().unwrap();
        let previous_posted_at = rows.get(&external_id).and_then(|r| r.posted_at);
        let outcome = if rows.contains_key(&external_id) {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        rows.insert(
            external_id,
            JobPosting {
                external_id,
                fields: fields.clone(),
                posted_at: posted_at.or(previous_posted_at),
                updated_at: Utc::now(),
            },
        );
        self.writes.lock().unwrap().push(external_id);
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock crawl reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl crate::crawl::CrawlReporter for MockReporter {
    fn report(&self, event: crate::crawl::CrawlEvent<'_>) {
        use crate::crawl::CrawlEvent;

        let label = match &event {
            CrawlEvent::Phase(phase) => format!("Phase:{phase}"),
            CrawlEvent::Resolved { .. } => "Resolved".to_string(),
            CrawlEvent::ItemSkipped { .. } => "ItemSkipped".to_string(),
            CrawlEvent::ItemFailed { .. } => "ItemFailed".to_string(),
            CrawlEvent::ItemPersisted { .. } => "ItemPersisted".to_string(),
            CrawlEvent::Finished { .. } => "Finished".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Base URL used by API-level tests.
pub const TEST_API_BASE: &str = "http://hn.test/v0";

/// A live comment with the given HTML text.
pub fn make_comment(id: u64, text: &str) -> HnItem {
    HnItem {
        id,
        kind: Some(crate::models::ItemKind::Comment),
        by: Some("poster".to_string()),
        text: Some(text.to_string()),
        time: Some(1_746_108_000),
        ..Default::default()
    }
}

/// A story with the given title and children.
pub fn make_story(id: u64, title: &str, kids: Vec<u64>) -> HnItem {
    HnItem {
        id,
        kind: Some(crate::models::ItemKind::Story),
        by: Some("whoishiring".to_string()),
        title: Some(title.to_string()),
        time: Some(1_746_108_000),
        kids,
        ..Default::default()
    }
}

/// A job story.
pub fn make_job(id: u64, title: &str) -> HnItem {
    HnItem {
        id,
        kind: Some(crate::models::ItemKind::Job),
        title: Some(title.to_string()),
        url: Some(format!("https://jobs.example.com/{id}")),
        time: Some(1_746_108_000),
        ..Default::default()
    }
}

/// Resolver returning a fixed answer.
pub struct MockResolver {
    result: Mutex<Option<Result<u64, AppError>>>,
}

impl MockResolver {
    pub fn found(id: u64) -> Self {
        Self {
            result: Mutex::new(Some(Ok(id))),
        }
    }

    pub fn failing(error: AppError) -> Self {
        Self {
            result: Mutex::new(Some(Err(error))),
        }
    }
}

impl crate::traits::ThreadResolver for MockResolver {
    async fn resolve(&self) -> Result<u64, AppError> {
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(AppError::Generic("resolver already used".into())))
    }
}
