//! Request pacing for the Hacker News API.
//!
//! Wraps any [`Fetcher`] with two limits that together keep a crawl under
//! the API's informal rate limit:
//!
//! - a fixed idle delay between the end of one request and the start of
//!   the next, and
//! - a hard cap on requests per rolling window. Once the cap is hit, the
//!   next call sleeps out the rest of the window, then starts a new one.
//!
//! Both waits block the calling task. A crawl is a single sequential task,
//! so pacing the fetcher paces the whole crawl.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use hnjobs_core::throttle::{RateLimitConfig, RateLimitedFetcher};
//!
//! # use hnjobs_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<serde_json::Value, hnjobs_core::error::AppError> { todo!() }
//! # }
//! let config = RateLimitConfig::default()
//!     .with_min_delay(Duration::from_millis(250))
//!     .with_max_requests(60);
//! let fetcher = RateLimitedFetcher::new(MyFetcher, config);
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::error::AppError;
use crate::traits::Fetcher;

/// Default pause between consecutive requests.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);
/// Default request budget per window.
pub const DEFAULT_MAX_REQUESTS_PER_WINDOW: u32 = 30;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Configuration for the rate-limited fetcher.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Idle gap between the end of one request and the start of the next.
    pub min_delay: Duration,

    /// Maximum number of requests issued within one window.
    pub max_requests: u32,

    /// Length of the rate-limit window.
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn with_max_requests(mut self, max: u32) -> Self {
        self.max_requests = max.max(1);
        self
    }
}

impl Default for RateLimitConfig {
    /// 500ms between requests, at most 30 requests per minute.
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_requests: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Rolling-window bookkeeping shared by clones of one fetcher.
#[derive(Debug, Default)]
struct WindowState {
    window_start: Option<Instant>,
    requests_in_window: u32,
    last_finished: Option<Instant>,
}

/// A [`Fetcher`] wrapper that enforces a minimum delay and a per-window cap.
///
/// Clones share the same state, so every clone counts against one budget.
/// The state lock is held while waiting and for the duration of the inner
/// request, so concurrent callers queue up behind each other and the delay
/// is always measured from the moment the previous response arrived.
#[derive(Clone)]
pub struct RateLimitedFetcher<F> {
    inner: F,
    config: RateLimitConfig,
    state: Arc<Mutex<WindowState>>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    pub fn new(inner: F, config: RateLimitConfig) -> Self {
        Self {
            inner,
            config,
            state: Arc::new(Mutex::new(WindowState::default())),
        }
    }

    /// Wait until both limits allow one more request, then account for it.
    /// The returned guard must be held until the request completes.
    async fn acquire(&self) -> MutexGuard<'_, WindowState> {
        let mut state = self.state.lock().await;

        if state.requests_in_window >= self.config.max_requests {
            if let Some(start) = state.window_start {
                let elapsed = start.elapsed();
                if elapsed < self.config.window {
                    let sleep_for = self.config.window - elapsed;
                    tracing::info!(
                        sleep_secs = sleep_for.as_secs_f64(),
                        max_requests = self.config.max_requests,
                        "Rate limit reached, sleeping"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
            }
            state.requests_in_window = 0;
            state.window_start = None;
        }

        if let Some(last) = state.last_finished {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_delay {
                let sleep_for = self.config.min_delay - elapsed;
                tracing::trace!(sleep_ms = %sleep_for.as_millis(), "Pacing request");
                tokio::time::sleep(sleep_for).await;
            }
        }

        if state.window_start.is_none() {
            state.window_start = Some(Instant::now());
        }
        state.requests_in_window += 1;
        state
    }
}

impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, AppError> {
        let mut state = self.acquire().await;
        let result = self.inner.fetch(url).await;
        state.last_finished = Some(Instant::now());
        result
    }
}
