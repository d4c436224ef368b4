//! Fixed-window rate limiting middleware.
//!
//! Each identity key owns a `{count, reset_at}` window that is created
//! lazily, reset wholesale once the clock passes `reset_at`, and removed
//! by a periodic sweep. Two instances run in production: the general
//! limiter on everything, and a stricter one namespaced `auth` on the
//! login/refresh routes to blunt credential stuffing.
//!
//! The increment happens under the map's per-entry lock, so a single
//! process never interleaves read-increment-compare. Counters are not
//! shared across processes; a multi-instance deployment should key the
//! broker gateway's atomic `incr` with the same scheme instead.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::auth::models::Identity;
use crate::config::RateLimitConfig;
use crate::errors::ApiError;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

pub const X_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// One counting window. `count` only moves up until the reset boundary.
#[derive(Debug)]
struct Window {
    count: u64,
    reset_at: Instant,
}

/// Outcome of a rate-limit check, carrying the response annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Seconds until the window resets.
    pub reset_secs: u64,
}

/// Fixed-window counter over identity keys.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u64,
    /// Label for logs and metrics ("general" or "auth").
    scope: &'static str,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u64, scope: &'static str) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
            scope,
        }
    }

    pub fn general(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_secs(config.window_secs),
            config.max_requests,
            "general",
        )
    }

    pub fn auth(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_secs(config.auth.window_secs),
            config.auth.max_requests,
            "auth",
        )
    }

    /// Count a request against `key` and decide.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }
        entry.count += 1;

        let reset_secs = ceil_secs(entry.reset_at.saturating_duration_since(now));
        RateLimitDecision {
            allowed: entry.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_secs,
        }
    }

    /// Remove windows whose reset time has passed, bounding memory.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        before - self.windows.len()
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Derive the identity key for a request.
///
/// Preference order: authenticated subject id, then client address, then
/// a shared "unknown" bucket. The shared bucket means unauthenticated
/// callers without an address pool one budget; that is deliberate
/// traffic shaping, not an oversight.
fn identity_key(request: &Request<Body>) -> String {
    if let Some(identity) = request.extensions().get::<Identity>() {
        return identity.subject.clone();
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

/// Annotate a response with the quota headers, leaving any values a
/// stricter inner limiter already wrote in place.
fn annotate(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    if headers.contains_key(&X_RATE_LIMIT_LIMIT) {
        return;
    }
    headers.insert(X_RATE_LIMIT_LIMIT, header_value(decision.limit));
    headers.insert(X_RATE_LIMIT_REMAINING, header_value(decision.remaining));
    headers.insert(X_RATE_LIMIT_RESET, header_value(decision.reset_secs));
}

fn header_value(v: u64) -> HeaderValue {
    HeaderValue::from_str(&v.to_string()).unwrap_or(HeaderValue::from_static("0"))
}

/// Middleware enforcing one limiter instance. Every response is
/// annotated with quota metadata; denials additionally carry Retry-After.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = identity_key(&request);
    let decision = limiter.check(&key);

    if decision.allowed {
        let mut response = next.run(request).await;
        annotate(&mut response, &decision);
        return response;
    }

    tracing::warn!(
        client = %key,
        scope = limiter.scope(),
        retry_after = decision.reset_secs,
        "Rate limit exceeded"
    );
    metrics::record_rate_limited(limiter.scope());

    let mut response = ApiError::RateLimitExceeded {
        retry_after_secs: decision.reset_secs,
    }
    .into_response();
    annotate(&mut response, &decision);
    response.headers_mut().insert(
        axum::http::header::RETRY_AFTER,
        header_value(decision.reset_secs),
    );
    response
}

/// Spawn the background sweep for a limiter, shutdown-aware.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration, shutdown: &Shutdown) {
    let mut rx = shutdown.subscribe();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let removed = limiter.sweep();
                    if removed > 0 {
                        tracing::trace!(scope = limiter.scope(), removed, "Swept expired rate-limit windows");
                    }
                }
                _ = rx.recv() => break,
            }
        }
    });
}
