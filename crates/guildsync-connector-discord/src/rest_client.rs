//! Rate-limited HTTP client for the directory API.
//!
//! One logical request flows through: cache lookup, the soft
//! backpressure valve, credential injection, transient-failure retries
//! with exponential backoff and jitter, 429 handling driven by the
//! server's retry-after, quota header tracking, and response caching.

use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use guildsync_cache::CacheStore;
use guildsync_core::{DirectoryError, DirectoryResult};

use crate::config::{DiscordConfig, DiscordCredentials};
use crate::metrics::ApiMetrics;
use crate::rate_limit::{parse_retry_after, RateLimitTracker};

/// Client identifier sent with every request.
const CLIENT_USER_AGENT: &str = "DiscordBot (https://github.com/guildsync/guildsync, 0.4.0)";

/// Error body returned by the directory API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    /// 429 bodies carry the retry delay in seconds as well.
    #[serde(default)]
    retry_after: Option<f64>,
}

/// Caching instructions for a GET request.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Store key.
    pub key: String,
    /// Endpoint-class lifetime.
    pub ttl: Duration,
}

/// The rate-limited API client.
pub struct DiscordRestClient {
    http: reqwest::Client,
    config: DiscordConfig,
    credentials: DiscordCredentials,
    store: Arc<dyn CacheStore>,
    tracker: RateLimitTracker,
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl DiscordRestClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Misconfigured`] when the configuration
    /// is invalid or the HTTP client cannot be built.
    pub fn new(
        config: DiscordConfig,
        credentials: DiscordCredentials,
        store: Arc<dyn CacheStore>,
    ) -> DirectoryResult<Self> {
        config
            .validate()
            .map_err(|message| DirectoryError::Misconfigured { message })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DirectoryError::Misconfigured {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        let tracker = RateLimitTracker::new(config.rate_limit.clone(), Arc::clone(&store));

        Ok(Self {
            http,
            config,
            credentials,
            store,
            tracker,
            metrics: Arc::new(RwLock::new(ApiMetrics::new())),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }

    /// Returns the shared cache store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the rate limit tracker.
    #[must_use]
    pub fn tracker(&self) -> &RateLimitTracker {
        &self.tracker
    }

    /// Returns a snapshot of current metrics.
    pub async fn metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    /// Performs a cacheable GET.
    ///
    /// `force` bypasses the cache read (a fresh response still refreshes
    /// the cache). `sensitive` shortens the timeout for interactive
    /// flows.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cache: Option<CachePolicy>,
        force: bool,
        sensitive: bool,
    ) -> DirectoryResult<T> {
        if !force {
            if let Some(policy) = &cache {
                match self.store.get(&policy.key).await {
                    Ok(Some(body)) => {
                        if let Ok(value) = serde_json::from_str(&body) {
                            debug!(endpoint = path, "Cache hit");
                            self.metrics.write().await.record_cache_hit();
                            return Ok(value);
                        }
                        // A corrupt entry must not pin the endpoint.
                        let _ = self.store.delete(&policy.key).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!(endpoint = path, error = %e, "Cache read failed, fetching");
                    }
                }
            }
        }

        let body = self
            .execute(reqwest::Method::GET, path, None::<&()>, sensitive)
            .await?;

        if let Some(policy) = &cache {
            if let Err(e) = self.store.set(&policy.key, &body, policy.ttl).await {
                debug!(endpoint = path, error = %e, "Cache write failed");
            }
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Performs a PATCH with a JSON body, discarding the response body.
    pub async fn patch_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> DirectoryResult<()> {
        self.execute(reqwest::Method::PATCH, path, Some(body), false)
            .await
            .map(|_| ())
    }

    /// Performs a POST with a JSON body, discarding the response body.
    pub async fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> DirectoryResult<()> {
        self.execute(reqwest::Method::POST, path, Some(body), false)
            .await
            .map(|_| ())
    }

    /// Internal method that performs the request with retry logic and
    /// returns the raw response body.
    async fn execute<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
        sensitive: bool,
    ) -> DirectoryResult<String> {
        // Soft backpressure valve: when quota is nearly gone, sleep once
        // and re-check instead of rejecting.
        if self.tracker.near_exhaustion().await {
            self.tracker.soft_wait().await;
        }

        let url = self.url(path);
        let timeout = if sensitive {
            Duration::from_secs(self.config.sensitive_timeout_secs)
        } else {
            Duration::from_secs(self.config.request_timeout_secs)
        };

        let started = Instant::now();
        let mut transient_retries = 0u32;
        let mut rate_limit_retries = 0u32;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .timeout(timeout)
                .header(
                    AUTHORIZATION,
                    format!("Bot {}", self.credentials.bot_token.expose_secret()),
                )
                .header(USER_AGENT, CLIENT_USER_AGENT);

            if let Some(b) = body {
                request = request.json(b);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let error = map_transport_error(e, timeout);
                    if error.is_retryable() && transient_retries < self.max_transient_retries() {
                        let delay = self
                            .tracker
                            .add_jitter(self.tracker.backoff_delay(transient_retries));
                        transient_retries += 1;
                        self.metrics.write().await.record_retry();
                        warn!(
                            endpoint = path,
                            error = %error,
                            retry = transient_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Transport failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return self.fail(path, started, error).await;
                }
            };

            let status = response.status();

            // Quota headers arrive on every response, including errors.
            let remaining = header_str(&response, "X-RateLimit-Remaining");
            let reset_after = header_str(&response, "X-RateLimit-Reset-After");
            self.tracker
                .record_headers(remaining.as_deref(), reset_after.as_deref())
                .await;

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.metrics.write().await.record_rate_limited();

                let header_value = header_str(&response, "Retry-After");
                let body_text = response.text().await.unwrap_or_default();
                let retry_after = header_value
                    .as_deref()
                    .and_then(parse_retry_after)
                    .or_else(|| {
                        serde_json::from_str::<ApiErrorBody>(&body_text)
                            .ok()
                            .and_then(|b| b.retry_after)
                            .filter(|s| s.is_finite() && *s >= 0.0)
                            .map(Duration::from_secs_f64)
                    })
                    .unwrap_or(Duration::from_secs(1));

                // Short-lived marker so an immediate repeat call backs
                // off before hitting the network.
                self.tracker.mark_cooldown(retry_after).await;

                if rate_limit_retries >= self.config.rate_limit.max_rate_limit_retries {
                    let error = DirectoryError::RateLimited {
                        retry_after_secs: retry_after.as_secs(),
                    };
                    return self.fail(path, started, error).await;
                }

                let delay = self.tracker.rate_limit_delay(retry_after);
                rate_limit_retries += 1;
                self.metrics.write().await.record_retry();
                warn!(
                    endpoint = path,
                    retry = rate_limit_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, waiting for server-provided retry-after"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.is_server_error() && transient_retries < self.max_transient_retries() {
                let delay = self
                    .tracker
                    .add_jitter(self.tracker.backoff_delay(transient_retries));
                transient_retries += 1;
                self.metrics.write().await.record_retry();
                warn!(
                    endpoint = path,
                    status = status.as_u16(),
                    retry = transient_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Transient server error, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.is_success() {
                let body = response.text().await.map_err(|e| DirectoryError::Network {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                self.metrics.write().await.record_request(true);
                debug!(
                    endpoint = path,
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request succeeded"
                );
                return Ok(body);
            }

            let body_text = response.text().await.unwrap_or_default();
            let error = map_status_error(status, path, &body_text);
            return self.fail(path, started, error).await;
        }
    }

    fn max_transient_retries(&self) -> u32 {
        self.config.rate_limit.max_transient_retries
    }

    async fn fail(
        &self,
        path: &str,
        started: Instant,
        error: DirectoryError,
    ) -> DirectoryResult<String> {
        self.metrics.write().await.record_request(false);
        warn!(
            endpoint = path,
            error = %error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request failed"
        );
        Err(error)
    }
}

fn header_str(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn map_transport_error(error: reqwest::Error, timeout: Duration) -> DirectoryError {
    if error.is_timeout() {
        DirectoryError::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else {
        DirectoryError::Network {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

fn map_status_error(status: StatusCode, path: &str, body: &str) -> DirectoryError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let code = parsed.as_ref().map_or(0, |b| b.code);
    let message = parsed
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::NOT_FOUND => DirectoryError::NotFound {
            resource: path.to_string(),
            id: None,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DirectoryError::Unauthorized { message }
        }
        _ => DirectoryError::Api {
            status: status.as_u16(),
            code: code.to_string(),
            message,
        },
    }
}
