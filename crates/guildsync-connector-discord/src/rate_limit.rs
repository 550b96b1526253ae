//! Rate limit tracking for directory API requests.
//!
//! The directory reports its quota in `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset-After` response headers. The tracker keeps a
//! process-local snapshot and mirrors it into the shared cache store so
//! concurrent processes observe each other's consumption. It also owns
//! the backoff math used by the client's retry loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use guildsync_cache::{keys, CacheStore};

use crate::config::RateLimitConfig;

/// The bucket name used for guild-wide quota tracking.
pub const GLOBAL_BUCKET: &str = "global";

/// A point-in-time view of the directory's quota.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    /// Requests left in the current window.
    pub remaining: i64,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
    /// When the snapshot was taken.
    pub observed_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    /// Whether the window the snapshot describes has already reset.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.reset_at <= now
    }
}

/// Tracks quota and computes retry delays.
pub struct RateLimitTracker {
    config: RateLimitConfig,
    store: Arc<dyn CacheStore>,
    local: RwLock<Option<RateLimitSnapshot>>,
}

impl RateLimitTracker {
    /// Creates a tracker backed by the shared store.
    pub fn new(config: RateLimitConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store,
            local: RwLock::new(None),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records quota headers from a response and mirrors them into the
    /// shared store. Unparseable headers are ignored.
    pub async fn record_headers(&self, remaining: Option<&str>, reset_after: Option<&str>) {
        let Some(remaining) = remaining.and_then(|v| v.trim().parse::<i64>().ok()) else {
            return;
        };
        let reset_after_secs = reset_after
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(1.0);

        let now = Utc::now();
        let snapshot = RateLimitSnapshot {
            remaining,
            reset_at: now + chrono::Duration::milliseconds((reset_after_secs * 1000.0) as i64),
            observed_at: now,
        };

        *self.local.write().await = Some(snapshot);

        // Mirror for other processes; the entry is useless past the
        // window, so the TTL matches it. Store failures degrade to
        // local-only visibility.
        if let Ok(value) = serde_json::to_string(&snapshot) {
            let ttl = Duration::from_millis((reset_after_secs * 1000.0).max(1000.0) as u64);
            if let Err(e) = self.store.set(&keys::rate_limit(GLOBAL_BUCKET), &value, ttl).await {
                debug!(error = %e, "Could not mirror rate limit snapshot to store");
            }
        }
    }

    /// Current snapshot: local first, then the shared store.
    pub async fn snapshot(&self) -> Option<RateLimitSnapshot> {
        let now = Utc::now();

        if let Some(snapshot) = *self.local.read().await {
            if !snapshot.is_stale(now) {
                return Some(snapshot);
            }
        }

        match self.store.get(&keys::rate_limit(GLOBAL_BUCKET)).await {
            Ok(Some(value)) => serde_json::from_str::<RateLimitSnapshot>(&value)
                .ok()
                .filter(|s| !s.is_stale(now)),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Rate limit store read failed, assuming no snapshot");
                None
            }
        }
    }

    /// Whether the quota is at or below the protection threshold, or a
    /// recent 429 left a cooldown marker.
    pub async fn near_exhaustion(&self) -> bool {
        if let Ok(Some(_)) = self
            .store
            .get(&keys::rate_limit_cooldown(GLOBAL_BUCKET))
            .await
        {
            return true;
        }

        match self.snapshot().await {
            Some(snapshot) => snapshot.remaining <= self.config.protection_threshold,
            None => false,
        }
    }

    /// Sleeps once to let the window advance (the soft backpressure
    /// valve from the request pipeline).
    pub async fn soft_wait(&self) {
        warn!(
            wait_ms = self.config.soft_wait_ms,
            "Quota near exhaustion, applying soft backpressure"
        );
        tokio::time::sleep(Duration::from_millis(self.config.soft_wait_ms)).await;
    }

    /// Marks the bucket as cooling down after a 429 so an immediate
    /// repeat call does not hammer the endpoint.
    pub async fn mark_cooldown(&self, retry_after: Duration) {
        if let Err(e) = self
            .store
            .set(
                &keys::rate_limit_cooldown(GLOBAL_BUCKET),
                "1",
                retry_after,
            )
            .await
        {
            debug!(error = %e, "Could not write rate limit cooldown marker");
        }
    }

    /// Backoff delay for a transient-failure retry: `2^attempt` seconds
    /// scaled by the base delay and capped.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay_ms as f64;
        let max = self.config.max_delay_ms as f64;
        let delay_ms = (base * 2_f64.powi(attempt as i32)).min(max);
        Duration::from_millis(delay_ms as u64)
    }

    /// Adds jitter to a delay using the configured factor.
    #[must_use]
    pub fn add_jitter(&self, delay: Duration) -> Duration {
        use rand::Rng;

        if self.config.jitter_factor <= 0.0 {
            return delay;
        }

        let delay_ms = delay.as_millis() as f64;
        let jitter_range = delay_ms * self.config.jitter_factor;
        let jitter = rand::thread_rng().gen_range(0.0..=jitter_range.max(f64::EPSILON));

        Duration::from_millis((delay_ms + jitter) as u64)
    }

    /// The wait applied after a 429: the server-provided retry-after
    /// plus the configured safety buffer.
    #[must_use]
    pub fn rate_limit_delay(&self, retry_after: Duration) -> Duration {
        retry_after + Duration::from_millis(self.config.retry_after_buffer_ms)
    }
}

/// Parses a `Retry-After` value. The directory sends seconds, sometimes
/// fractional; sub-second values round up.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let secs = header_value.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_millis((secs * 1000.0).ceil() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildsync_cache::MemoryStore;

    fn tracker(config: RateLimitConfig) -> RateLimitTracker {
        RateLimitTracker::new(config, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after("  1.5  "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("0.001"), Some(Duration::from_millis(1)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_backoff_delay_grows_exponentially_and_caps() {
        let t = tracker(RateLimitConfig {
            base_delay_ms: 1000,
            max_delay_ms: 5000,
            ..RateLimitConfig::default()
        });

        assert_eq!(t.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(t.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(t.backoff_delay(2), Duration::from_millis(4000));
        // Capped.
        assert_eq!(t.backoff_delay(3), Duration::from_millis(5000));
        assert_eq!(t.backoff_delay(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let t = tracker(RateLimitConfig {
            jitter_factor: 0.25,
            ..RateLimitConfig::default()
        });

        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = t.add_jitter(base).as_millis() as u64;
            assert!(jittered >= 1000, "jitter must never shorten the delay");
            assert!(jittered <= 1250, "jitter {jittered} exceeds factor bound");
        }
    }

    #[test]
    fn test_zero_jitter_factor_is_identity() {
        let t = tracker(RateLimitConfig {
            jitter_factor: 0.0,
            ..RateLimitConfig::default()
        });
        assert_eq!(t.add_jitter(Duration::from_millis(700)), Duration::from_millis(700));
    }

    #[test]
    fn test_rate_limit_delay_adds_buffer() {
        let t = tracker(RateLimitConfig {
            retry_after_buffer_ms: 500,
            ..RateLimitConfig::default()
        });
        assert_eq!(
            t.rate_limit_delay(Duration::from_secs(3)),
            Duration::from_millis(3500)
        );
    }

    #[tokio::test]
    async fn test_record_headers_updates_snapshot() {
        let t = tracker(RateLimitConfig::default());
        assert!(t.snapshot().await.is_none());

        t.record_headers(Some("4"), Some("2.5")).await;

        let snapshot = t.snapshot().await.unwrap();
        assert_eq!(snapshot.remaining, 4);
        assert!(!snapshot.is_stale(Utc::now()));
    }

    #[tokio::test]
    async fn test_unparseable_headers_are_ignored() {
        let t = tracker(RateLimitConfig::default());
        t.record_headers(Some("lots"), Some("2.5")).await;
        assert!(t.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_near_exhaustion_threshold() {
        let t = tracker(RateLimitConfig {
            protection_threshold: 2,
            ..RateLimitConfig::default()
        });

        t.record_headers(Some("5"), Some("5")).await;
        assert!(!t.near_exhaustion().await);

        t.record_headers(Some("2"), Some("5")).await;
        assert!(t.near_exhaustion().await);

        t.record_headers(Some("0"), Some("5")).await;
        assert!(t.near_exhaustion().await);
    }

    #[tokio::test]
    async fn test_cooldown_marker_reports_exhaustion() {
        let t = tracker(RateLimitConfig::default());
        assert!(!t.near_exhaustion().await);

        t.mark_cooldown(Duration::from_secs(5)).await;
        assert!(t.near_exhaustion().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_shared_through_the_store() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        let writer = RateLimitTracker::new(RateLimitConfig::default(), Arc::clone(&store));
        let reader = RateLimitTracker::new(RateLimitConfig::default(), store);

        writer.record_headers(Some("1"), Some("5")).await;

        // The reader has no local snapshot and falls back to the store.
        let snapshot = reader.snapshot().await.unwrap();
        assert_eq!(snapshot.remaining, 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_discarded() {
        let t = tracker(RateLimitConfig::default());
        t.record_headers(Some("0"), Some("0")).await;

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(t.snapshot().await.is_none());
        assert!(!t.near_exhaustion().await);
    }
}
