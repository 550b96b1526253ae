//! Request metrics for observability.
//!
//! Totals for the life of the client plus a daily rolling window kept
//! for 30 days, so operators can spot error-rate drift without an
//! external metrics pipeline.

use chrono::{NaiveDate, Utc};
use std::collections::VecDeque;

/// Days of per-day statistics retained.
const DAILY_RETENTION_DAYS: i64 = 30;

/// Counters for a single UTC day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    /// The UTC date the counters cover.
    pub date: NaiveDate,
    /// Requests issued (including cache hits).
    pub requests: u64,
    /// Requests that ended in an error.
    pub errors: u64,
}

/// Metrics kept by the REST client.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    /// Total logical requests (cache hits included).
    pub total_requests: u64,
    /// Requests served from cache without a network call.
    pub cache_hits: u64,
    /// 429 responses received.
    pub rate_limited_count: u64,
    /// Retry attempts made (transient and rate-limit retries).
    pub retry_count: u64,
    /// Requests that ultimately failed.
    pub error_count: u64,
    /// Per-day counters, oldest first.
    daily: VecDeque<DailyStats>,
}

impl ApiMetrics {
    /// Creates empty metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one logical request.
    pub fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if !success {
            self.error_count += 1;
        }

        let today = Utc::now().date_naive();
        match self.daily.back_mut() {
            Some(day) if day.date == today => {
                day.requests += 1;
                if !success {
                    day.errors += 1;
                }
            }
            _ => {
                self.daily.push_back(DailyStats {
                    date: today,
                    requests: 1,
                    errors: u64::from(!success),
                });
            }
        }
        self.prune(today);
    }

    /// Records a cache hit (also counted as a request).
    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
        self.record_request(true);
    }

    /// Records a 429 response.
    pub fn record_rate_limited(&mut self) {
        self.rate_limited_count += 1;
    }

    /// Records a retry attempt.
    pub fn record_retry(&mut self) {
        self.retry_count += 1;
    }

    /// The retained per-day counters, oldest first.
    #[must_use]
    pub fn daily(&self) -> impl Iterator<Item = &DailyStats> {
        self.daily.iter()
    }

    /// The error ratio over all requests.
    #[must_use]
    pub fn error_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.error_count as f64 / self.total_requests as f64
        }
    }

    fn prune(&mut self, today: NaiveDate) {
        let cutoff = today - chrono::Duration::days(DAILY_RETENTION_DAYS);
        while self.daily.front().is_some_and(|d| d.date < cutoff) {
            self.daily.pop_front();
        }
    }
}
