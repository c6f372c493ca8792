//! Crawl orchestration: resolve a target, then fetch → extract → upsert
//! each candidate item in order.
//!
//! ```text
//! Idle → ResolvingTarget → [Fetching → Extracting → Persisting]* → Done
//! ```
//!
//! Only target resolution can fail the run. Per-item fetch and extraction
//! errors are reported and skipped. Store errors propagate to the caller.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::api::HnClient;
use crate::error::AppError;
use crate::models::{HnItem, JobFields, UpsertOutcome};
use crate::traits::{FieldExtractor, Fetcher, JobStore, ThreadResolver};

/// Default number of ids examined by the historical job scan.
pub const DEFAULT_HISTORICAL_LIMIT: u64 = 1000;
/// Default batch of ids below `maxitem` scanned per run.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Phases of a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    ResolvingTarget,
    Fetching,
    Extracting,
    Persisting,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CrawlPhase::Idle => "idle",
            CrawlPhase::ResolvingTarget => "resolving_target",
            CrawlPhase::Fetching => "fetching",
            CrawlPhase::Extracting => "extracting",
            CrawlPhase::Persisting => "persisting",
            CrawlPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Tuning knobs for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Stop after this many items with content. `None` crawls everything.
    pub limit: Option<usize>,
    /// Upper bound on ids scanned backward from `maxitem` for job stories.
    pub historical_limit: u64,
    /// Ids scanned per run, capped by `historical_limit`.
    pub batch_size: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            limit: None,
            historical_limit: DEFAULT_HISTORICAL_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CrawlConfig {
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_historical_limit(mut self, limit: u64) -> Self {
        self.historical_limit = limit;
        self
    }

    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size;
        self
    }

    /// Number of ids the historical scan visits.
    pub fn historical_span(&self) -> u64 {
        self.batch_size.min(self.historical_limit)
    }
}

/// Final tally of a crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Candidate ids after discovery.
    pub candidates: usize,
    /// Candidates fetched (successfully or not).
    pub visited: usize,
    /// Items whose extraction produced content; counts toward the limit.
    pub found: usize,
    /// Rows inserted or updated.
    pub persisted: usize,
    /// Missing, deleted, text-less, or empty-extraction items.
    pub skipped: usize,
    /// Items dropped because a fetch or extraction failed.
    pub failed: usize,
}

/// Events emitted during a crawl for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    Phase(CrawlPhase),
    Resolved {
        target: &'a str,
        candidates: usize,
    },
    ItemSkipped {
        id: u64,
        reason: &'a str,
    },
    ItemFailed {
        id: u64,
        error: &'a str,
    },
    ItemPersisted {
        id: u64,
        outcome: UpsertOutcome,
        fields: &'a JobFields,
    },
    Finished {
        summary: &'a CrawlSummary,
    },
}

/// Trait for receiving crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::Phase(phase) => {
                tracing::trace!(%phase, "Crawl phase");
            }
            CrawlEvent::Resolved { target, candidates } => {
                tracing::info!(%target, %candidates, "Crawl target resolved");
            }
            CrawlEvent::ItemSkipped { id, reason } => {
                tracing::debug!(%id, %reason, "Item skipped");
            }
            CrawlEvent::ItemFailed { id, error } => {
                tracing::warn!(%id, %error, "Item failed");
            }
            CrawlEvent::ItemPersisted {
                id,
                outcome,
                fields,
            } => {
                tracing::info!(
                    %id,
                    ?outcome,
                    company = fields.company.as_deref().unwrap_or("-"),
                    role = fields.role.as_deref().unwrap_or("-"),
                    "Job saved"
                );
            }
            CrawlEvent::Finished { summary } => {
                tracing::info!(
                    candidates = summary.candidates,
                    visited = summary.visited,
                    found = summary.found,
                    persisted = summary.persisted,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "Crawl finished"
                );
            }
        }
    }
}

/// Orchestrates a crawl over the HN API.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP, LLM, or database calls.
pub struct CrawlService<F, E, S>
where
    F: Fetcher,
    E: FieldExtractor,
    S: JobStore,
{
    client: HnClient<F>,
    extractor: E,
    store: S,
    config: CrawlConfig,
}

impl<F, E, S> CrawlService<F, E, S>
where
    F: Fetcher,
    E: FieldExtractor,
    S: JobStore,
{
    pub fn new(client: HnClient<F>, extractor: E, store: S, config: CrawlConfig) -> Self {
        Self {
            client,
            extractor,
            store,
            config,
        }
    }

    /// Crawl the top-level comments of a known thread.
    pub async fn crawl_thread<R: CrawlReporter>(
        &self,
        thread_id: u64,
        reporter: &R,
    ) -> Result<CrawlSummary, AppError> {
        reporter.report(CrawlEvent::Phase(CrawlPhase::Idle));
        reporter.report(CrawlEvent::Phase(CrawlPhase::ResolvingTarget));
        self.crawl_resolved_thread(thread_id, reporter).await
    }

    /// Ask `resolver` for the current hiring thread, then crawl it.
    ///
    /// A resolver failure (including "no thread found") ends the run.
    pub async fn crawl_current_thread<T: ThreadResolver, R: CrawlReporter>(
        &self,
        resolver: &T,
        reporter: &R,
    ) -> Result<CrawlSummary, AppError> {
        reporter.report(CrawlEvent::Phase(CrawlPhase::Idle));
        reporter.report(CrawlEvent::Phase(CrawlPhase::ResolvingTarget));
        let thread_id = resolver.resolve().await?;
        self.crawl_resolved_thread(thread_id, reporter).await
    }

    async fn crawl_resolved_thread<R: CrawlReporter>(
        &self,
        thread_id: u64,
        reporter: &R,
    ) -> Result<CrawlSummary, AppError> {
        let thread = self
            .client
            .item(thread_id)
            .await?
            .ok_or_else(|| AppError::ThreadNotFound(format!("item {thread_id}")))?;

        let target = format!("thread {thread_id}");
        reporter.report(CrawlEvent::Resolved {
            target: &target,
            candidates: thread.kids.len(),
        });

        self.process(thread.kids, HashMap::new(), reporter).await
    }

    /// Crawl the current job stories plus a bounded backward scan of
    /// older ids for `job` items.
    pub async fn crawl_job_stories<R: CrawlReporter>(
        &self,
        reporter: &R,
    ) -> Result<CrawlSummary, AppError> {
        reporter.report(CrawlEvent::Phase(CrawlPhase::Idle));
        reporter.report(CrawlEvent::Phase(CrawlPhase::ResolvingTarget));

        let latest = self.client.job_stories().await?;
        let max_id = self.client.max_item().await?;
        let historical = self.scan_historical_jobs(max_id).await;

        let mut seen = HashSet::new();
        let candidates: Vec<u64> = latest
            .into_iter()
            .chain(historical.iter().map(|item| item.id))
            .filter(|id| seen.insert(*id))
            .collect();

        if candidates.is_empty() {
            tracing::warn!("No job stories found");
        }

        let target = format!("job stories (maxitem {max_id})");
        reporter.report(CrawlEvent::Resolved {
            target: &target,
            candidates: candidates.len(),
        });

        let prefetched = historical.into_iter().map(|item| (item.id, item)).collect();
        self.process(candidates, prefetched, reporter).await
    }

    /// Walk ids strictly downward from `max_id`, keeping `job` items.
    /// Items that fail to load are logged and skipped.
    async fn scan_historical_jobs(&self, max_id: u64) -> Vec<HnItem> {
        let span = self.config.historical_span();
        let floor = max_id.saturating_sub(span);
        tracing::info!(ids = span, from = max_id, "Scanning items for job posts");

        let mut jobs = Vec::new();
        for (i, id) in (floor + 1..=max_id).rev().enumerate() {
            if (i + 1) % 10 == 0 {
                tracing::info!(
                    progress = %format!("{}/{}", i + 1, span),
                    found = jobs.len(),
                    "Historical scan progress"
                );
            }
            match self.client.item(id).await {
                Ok(Some(item)) if item.is_job() => {
                    tracing::debug!(id, "Found job post");
                    jobs.push(item);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(id, error = %e, "Error fetching item"),
            }
        }
        jobs
    }

    async fn process<R: CrawlReporter>(
        &self,
        candidates: Vec<u64>,
        mut prefetched: HashMap<u64, HnItem>,
        reporter: &R,
    ) -> Result<CrawlSummary, AppError> {
        let mut summary = CrawlSummary {
            candidates: candidates.len(),
            ..Default::default()
        };

        for id in candidates {
            if self.config.limit.is_some_and(|n| summary.found >= n) {
                break;
            }

            reporter.report(CrawlEvent::Phase(CrawlPhase::Fetching));
            summary.visited += 1;
            let item = match prefetched.remove(&id) {
                Some(item) => item,
                None => match self.client.item(id).await {
                    Ok(Some(item)) => item,
                    Ok(None) => {
                        summary.skipped += 1;
                        reporter.report(CrawlEvent::ItemSkipped {
                            id,
                            reason: "missing",
                        });
                        continue;
                    }
                    Err(e) => {
                        summary.failed += 1;
                        let error = e.to_string();
                        reporter.report(CrawlEvent::ItemFailed { id, error: &error });
                        continue;
                    }
                },
            };

            if !item.is_live() {
                summary.skipped += 1;
                reporter.report(CrawlEvent::ItemSkipped {
                    id,
                    reason: "deleted",
                });
                continue;
            }
            let Some(text) = item.extraction_text() else {
                summary.skipped += 1;
                reporter.report(CrawlEvent::ItemSkipped {
                    id,
                    reason: "no text",
                });
                continue;
            };

            reporter.report(CrawlEvent::Phase(CrawlPhase::Extracting));
            let fields = match self.extractor.extract(&text).await {
                Ok(fields) => fields,
                Err(e) => {
                    summary.failed += 1;
                    let error = format!("{} extraction failed: {e}", self.extractor.name());
                    reporter.report(CrawlEvent::ItemFailed { id, error: &error });
                    continue;
                }
            };

            if !fields.has_content() {
                summary.skipped += 1;
                reporter.report(CrawlEvent::ItemSkipped {
                    id,
                    reason: "empty extraction",
                });
                continue;
            }
            summary.found += 1;

            reporter.report(CrawlEvent::Phase(CrawlPhase::Persisting));
            let external_id = i64::try_from(id)
                .map_err(|_| AppError::Generic(format!("Item id {id} does not fit in BIGINT")))?;
            let outcome = self
                .store
                .upsert(external_id, &fields, item.posted_at())
                .await?;
            if outcome.is_write() {
                summary.persisted += 1;
                reporter.report(CrawlEvent::ItemPersisted {
                    id,
                    outcome,
                    fields: &fields,
                });
            }
        }

        reporter.report(CrawlEvent::Phase(CrawlPhase::Done));
        reporter.report(CrawlEvent::Finished { summary: &summary });
        Ok(summary)
    }
}
