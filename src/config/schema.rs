//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API
//! core. All types derive Serde traits for deserialization from config
//! files; secrets can additionally be overridden from the environment by
//! the loader.

use serde::{Deserialize, Serialize};

/// Root configuration for the fleet API core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FleetConfig {
    /// Deployment environment. Controls stack-trace exposure in the
    /// error envelope.
    pub environment: Environment,

    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Token signing and session lifetime settings.
    pub auth: AuthConfig,

    /// Fixed-window rate limiting settings.
    pub rate_limit: RateLimitConfig,

    /// Broker (cache + pub/sub) settings.
    pub broker: BrokerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 1024 * 1024,
        }
    }
}

/// Token signing and session lifetime configuration.
///
/// Access and refresh tokens are signed with distinct secrets so a leaked
/// access token can never be replayed against the refresh endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens. Overridable via `FLEET_ACCESS_SECRET`.
    pub access_secret: String,

    /// HMAC secret for refresh tokens. Overridable via `FLEET_REFRESH_SECRET`.
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default 24h).
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default 7d).
    pub refresh_ttl_secs: u64,

    /// Absolute session lifetime in seconds, independent of token expiry.
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl_secs: 24 * 60 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            session_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window size for the general limiter, in seconds.
    pub window_secs: u64,

    /// Maximum requests per window per identity key.
    pub max_requests: u64,

    /// Stricter limiter applied to authentication endpoints.
    pub auth: AuthRateLimitConfig,

    /// Interval for the expired-window sweep task, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_requests: 100,
            auth: AuthRateLimitConfig::default(),
            sweep_interval_secs: 60,
        }
    }
}

/// Tighter window/limit pair protecting login and refresh against
/// credential stuffing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthRateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u64,
}

impl Default for AuthRateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 5 * 60,
            max_requests: 10,
        }
    }
}

/// Broker connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker URL (e.g., "redis://127.0.0.1:6379"). Absence means the
    /// gateway starts in degraded mode and every operation is a no-op.
    pub url: Option<String>,

    /// Per-operation timeout in milliseconds.
    pub op_timeout_ms: u64,

    /// Base delay for reconnect backoff in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Cap for reconnect backoff in milliseconds.
    pub reconnect_max_delay_ms: u64,

    /// Attempts before the gateway announces degraded mode. Reconnects
    /// continue quietly at the capped delay afterwards.
    pub reconnect_announce_after: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: None,
            op_timeout_ms: 500,
            reconnect_base_delay_ms: 200,
            reconnect_max_delay_ms: 10_000,
            reconnect_announce_after: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
