//! Connector configuration and credentials.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use guildsync_core::GuildId;

/// Default public API base.
const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Configuration for rate limit handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Remaining-quota level at or below which the soft backpressure
    /// valve engages (default: 2).
    #[serde(default = "default_protection_threshold")]
    pub protection_threshold: i64,
    /// How long the backpressure valve sleeps before re-checking, in
    /// milliseconds (default: 1500).
    #[serde(default = "default_soft_wait_ms")]
    pub soft_wait_ms: u64,
    /// Maximum retries for transient transport/5xx failures (default: 3).
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,
    /// Maximum retries after a 429 response (default: 2).
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
    /// Safety buffer added on top of a server-provided retry-after, in
    /// milliseconds (default: 500).
    #[serde(default = "default_retry_after_buffer_ms")]
    pub retry_after_buffer_ms: u64,
    /// Base delay for exponential backoff in milliseconds (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum backoff delay cap in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter factor as a fraction of delay (default: 0.25 = 25%).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_protection_threshold() -> i64 {
    2
}

fn default_soft_wait_ms() -> u64 {
    1500
}

fn default_max_transient_retries() -> u32 {
    3
}

fn default_max_rate_limit_retries() -> u32 {
    2
}

fn default_retry_after_buffer_ms() -> u64 {
    500
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_factor() -> f64 {
    0.25
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            protection_threshold: default_protection_threshold(),
            soft_wait_ms: default_soft_wait_ms(),
            max_transient_retries: default_max_transient_retries(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            retry_after_buffer_ms: default_retry_after_buffer_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RateLimitConfig {
    /// Creates a configuration optimized for testing (shorter delays).
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            protection_threshold: 0,
            soft_wait_ms: 10,
            max_transient_retries: 3,
            max_rate_limit_retries: 2,
            retry_after_buffer_ms: 10,
            base_delay_ms: 10,
            max_delay_ms: 100,
            jitter_factor: 0.0,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay_ms == 0 {
            return Err("base_delay_ms must be > 0".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("max_delay_ms must be >= base_delay_ms".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("jitter_factor must be in range [0.0, 1.0]".to_string());
        }
        if self.protection_threshold < 0 {
            return Err("protection_threshold must be >= 0".to_string());
        }
        Ok(())
    }
}

/// Connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// The guild whose directory is synchronized.
    pub guild_id: GuildId,
    /// API base URL; overridable for tests and proxies.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Shorter timeout for latency-sensitive interactive checks
    /// (default: 5).
    #[serde(default = "default_sensitive_timeout_secs")]
    pub sensitive_timeout_secs: u64,
    /// Cache lifetime for the guild role list (default: 3600).
    #[serde(default = "default_role_cache_ttl_secs")]
    pub role_cache_ttl_secs: u64,
    /// Cache lifetime for member records (default: 300).
    #[serde(default = "default_member_cache_ttl_secs")]
    pub member_cache_ttl_secs: u64,
    /// Member-record cache lifetime inside sensitive flows (default: 30).
    #[serde(default = "default_sensitive_member_cache_ttl_secs")]
    pub sensitive_member_cache_ttl_secs: u64,
    /// Cache lifetime of the negative "member not found" marker
    /// (default: 60).
    #[serde(default = "default_negative_cache_ttl_secs")]
    pub negative_cache_ttl_secs: u64,
    /// Rate limit handling.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_sensitive_timeout_secs() -> u64 {
    5
}

fn default_role_cache_ttl_secs() -> u64 {
    3600
}

fn default_member_cache_ttl_secs() -> u64 {
    300
}

fn default_sensitive_member_cache_ttl_secs() -> u64 {
    30
}

fn default_negative_cache_ttl_secs() -> u64 {
    60
}

impl DiscordConfig {
    /// Creates a configuration for a guild with all defaults.
    #[must_use]
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
            sensitive_timeout_secs: default_sensitive_timeout_secs(),
            role_cache_ttl_secs: default_role_cache_ttl_secs(),
            member_cache_ttl_secs: default_member_cache_ttl_secs(),
            sensitive_member_cache_ttl_secs: default_sensitive_member_cache_ttl_secs(),
            negative_cache_ttl_secs: default_negative_cache_ttl_secs(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Overrides the API base URL. Trailing slashes are trimmed so path
    /// joining stays predictable.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the rate limit configuration.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.guild_id.value() == 0 {
            return Err("guild_id must be set".to_string());
        }
        if self.api_base.is_empty() {
            return Err("api_base must not be empty".to_string());
        }
        if self.request_timeout_secs == 0 || self.sensitive_timeout_secs == 0 {
            return Err("timeouts must be > 0".to_string());
        }
        if self.sensitive_timeout_secs > self.request_timeout_secs {
            return Err("sensitive_timeout_secs must be <= request_timeout_secs".to_string());
        }
        self.rate_limit.validate()
    }
}

/// The bot credential. Token acquisition is the host's concern; the
/// connector only attaches it to outbound requests.
#[derive(Clone)]
pub struct DiscordCredentials {
    /// Bearer token for the bot account.
    pub bot_token: SecretString,
}

impl DiscordCredentials {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into().into(),
        }
    }
}

impl std::fmt::Debug for DiscordCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordCredentials")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.protection_threshold, 2);
        assert_eq!(config.max_transient_retries, 3);
        assert_eq!(config.max_rate_limit_retries, 2);
        assert_eq!(config.retry_after_buffer_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_validation() {
        let mut config = RateLimitConfig::default();
        config.base_delay_ms = 0;
        assert!(config.validate().is_err());

        config.base_delay_ms = 1000;
        config.max_delay_ms = 500;
        assert!(config.validate().is_err());

        config.max_delay_ms = 30_000;
        config.jitter_factor = 1.5;
        assert!(config.validate().is_err());

        config.jitter_factor = 0.25;
        config.protection_threshold = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = DiscordConfig::new(GuildId::new(197_038_439_483_310_086));
        assert_eq!(config.api_base, "https://discord.com/api/v10");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.sensitive_timeout_secs, 5);
        assert!(config.role_cache_ttl_secs > config.member_cache_ttl_secs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DiscordConfig::new(GuildId::new(0));
        assert!(config.validate().is_err());

        config.guild_id = GuildId::new(1);
        assert!(config.validate().is_ok());

        config.sensitive_timeout_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_api_base_trims_trailing_slash() {
        let config =
            DiscordConfig::new(GuildId::new(1)).with_api_base("http://localhost:9999/api/");
        assert_eq!(config.api_base, "http://localhost:9999/api");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = DiscordCredentials::new("very-secret-token");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("very-secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DiscordConfig =
            serde_json::from_str(r#"{"guild_id":"197038439483310086"}"#).unwrap();
        assert_eq!(config.guild_id.value(), 197_038_439_483_310_086);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.rate_limit.max_rate_limit_retries, 2);
    }
}
