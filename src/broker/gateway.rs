//! Broker gateway: key/value cache, atomic counters and pub/sub over a
//! single redis connection, with silent degradation.
//!
//! The gateway is the only component that opens or closes broker
//! connections. When the broker is unreachable (no URL configured,
//! connect failure, per-call timeout, or a dropped connection) every
//! operation becomes a no-op returning a neutral default instead of an
//! error: the dashboard's auth and CRUD flows must keep working with the
//! broker absent. Reconnection runs in the background on a jittered
//! backoff schedule; the degraded notice is logged once, not per
//! operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;

use crate::config::BrokerConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::Backoff;

/// Time allowed for a (re)connect handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Operating state of the gateway, inspectable by health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerMode {
    Connected,
    Degraded,
}

impl BrokerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BrokerMode::Connected => "connected",
            BrokerMode::Degraded => "degraded",
        }
    }
}

struct Inner {
    /// Absent when no broker URL is configured; the gateway is then
    /// permanently degraded.
    client: Option<redis::Client>,
    conn: RwLock<Option<ConnectionManager>>,
    degraded: AtomicBool,
    reconnecting: AtomicBool,
    announced: AtomicBool,
    op_timeout: Duration,
    reconnect_base_delay_ms: u64,
    reconnect_max_delay_ms: u64,
    reconnect_announce_after: u32,
    shutdown: Shutdown,
}

/// Cloneable handle to the shared gateway.
#[derive(Clone)]
pub struct BrokerGateway {
    inner: Arc<Inner>,
}

impl BrokerGateway {
    /// Connect to the broker, or start degraded when `config.url` is
    /// absent or the broker does not answer. Never fails: broker
    /// availability must not gate startup.
    pub async fn connect(config: &BrokerConfig, shutdown: &Shutdown) -> Self {
        let client = config
            .url
            .as_deref()
            .and_then(|url| match redis::Client::open(url) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!(error = %e, "Invalid broker URL; gateway degraded");
                    None
                }
            });

        let gateway = Self {
            inner: Arc::new(Inner {
                client,
                conn: RwLock::new(None),
                degraded: AtomicBool::new(true),
                reconnecting: AtomicBool::new(false),
                announced: AtomicBool::new(false),
                op_timeout: Duration::from_millis(config.op_timeout_ms),
                reconnect_base_delay_ms: config.reconnect_base_delay_ms,
                reconnect_max_delay_ms: config.reconnect_max_delay_ms,
                reconnect_announce_after: config.reconnect_announce_after,
                shutdown: shutdown.clone(),
            }),
        };

        match &gateway.inner.client {
            None => {
                tracing::info!("No broker configured; gateway starts degraded");
                metrics::record_broker_mode(false);
            }
            Some(client) => {
                match timeout(CONNECT_TIMEOUT, client.get_connection_manager()).await {
                    Ok(Ok(conn)) => {
                        *gateway.inner.conn.write().await = Some(conn);
                        gateway.inner.degraded.store(false, Ordering::SeqCst);
                        metrics::record_broker_mode(true);
                        tracing::info!("Broker connected");
                    }
                    _ => {
                        tracing::warn!("Broker unreachable at startup; gateway degraded");
                        metrics::record_broker_mode(false);
                        gateway.spawn_reconnect();
                    }
                }
            }
        }

        gateway
    }

    /// Gateway with no broker at all. Used when the URL is absent and in
    /// tests.
    pub async fn disabled() -> Self {
        Self::connect(&BrokerConfig::default(), &Shutdown::new()).await
    }

    pub fn mode(&self) -> BrokerMode {
        if self.inner.degraded.load(Ordering::SeqCst) {
            BrokerMode::Degraded
        } else {
            BrokerMode::Connected
        }
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        if self.inner.degraded.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.conn.read().await.clone()
    }

    /// Record a transient failure: flip to degraded, drop the handle and
    /// start the background reconnect.
    async fn note_failure(&self, reason: &str) {
        if !self.inner.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(reason, "Broker operation failed; gateway degraded");
            metrics::record_broker_mode(false);
        }
        *self.inner.conn.write().await = None;
        self.spawn_reconnect();
    }

    fn spawn_reconnect(&self) {
        if self.inner.client.is_none() {
            return;
        }
        if self.inner.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }

        let gateway = self.clone();
        let mut shutdown_rx = self.inner.shutdown.subscribe();
        tokio::spawn(async move {
            let inner = &gateway.inner;
            let client = inner.client.as_ref().expect("reconnect requires a client");
            let mut backoff = Backoff::new(
                inner.reconnect_base_delay_ms,
                inner.reconnect_max_delay_ms,
            );

            loop {
                let delay = backoff.next_delay();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_rx.recv() => break,
                }

                match timeout(CONNECT_TIMEOUT, client.get_connection_manager()).await {
                    Ok(Ok(conn)) => {
                        *inner.conn.write().await = Some(conn);
                        inner.degraded.store(false, Ordering::SeqCst);
                        inner.announced.store(false, Ordering::SeqCst);
                        metrics::record_broker_mode(true);
                        tracing::info!(attempts = backoff.attempt(), "Broker reconnected");
                        break;
                    }
                    _ => {
                        if backoff.attempt() >= inner.reconnect_announce_after
                            && !inner.announced.swap(true, Ordering::SeqCst)
                        {
                            tracing::warn!(
                                attempts = backoff.attempt(),
                                "Broker still unreachable; staying degraded until it answers"
                            );
                        }
                    }
                }
            }
            inner.reconnecting.store(false, Ordering::SeqCst);
        });
    }

    /// Fetch a value. Degraded mode returns `None`.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        match timeout(self.inner.op_timeout, conn.get::<_, Option<String>>(key)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                self.note_failure(&e.to_string()).await;
                None
            }
            Err(_) => {
                self.note_failure("operation timed out").await;
                None
            }
        }
    }

    /// Store a value with an optional TTL. Degraded mode is a silent
    /// success.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let result = match ttl {
            Some(ttl) => {
                timeout(
                    self.inner.op_timeout,
                    conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()),
                )
                .await
            }
            None => timeout(self.inner.op_timeout, conn.set::<_, _, ()>(key, value)).await,
        };
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.note_failure(&e.to_string()).await,
            Err(_) => self.note_failure("operation timed out").await,
        }
    }

    /// Delete a key. Degraded mode is a silent success.
    pub async fn delete(&self, key: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        match timeout(self.inner.op_timeout, conn.del::<_, ()>(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.note_failure(&e.to_string()).await,
            Err(_) => self.note_failure("operation timed out").await,
        }
    }

    /// Atomically increment a counter. This is the primitive a
    /// multi-process deployment should back its rate-limit windows with.
    /// Degraded mode returns `None`.
    pub async fn incr(&self, key: &str) -> Option<i64> {
        let mut conn = self.connection().await?;
        match timeout(self.inner.op_timeout, conn.incr::<_, _, i64>(key, 1i64)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.note_failure(&e.to_string()).await;
                None
            }
            Err(_) => {
                self.note_failure("operation timed out").await;
                None
            }
        }
    }

    /// Publish a payload on a named channel. Returns whether the message
    /// actually went out; degraded mode drops it and reports success to
    /// callers via `dispatch`.
    async fn publish(&self, channel: &str, payload: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        match timeout(
            self.inner.op_timeout,
            conn.publish::<_, _, ()>(channel, payload),
        )
        .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                self.note_failure(&e.to_string()).await;
                false
            }
            Err(_) => {
                self.note_failure("operation timed out").await;
                false
            }
        }
    }

    /// Subscribe to a channel, receiving raw payloads on a bounded
    /// channel. Acknowledgment and retry orchestration belong to the
    /// consumer, not the gateway. Degraded mode returns `None`.
    pub async fn subscribe(&self, channel: &str) -> Option<mpsc::Receiver<String>> {
        let client = self.inner.client.as_ref()?;
        if self.inner.degraded.load(Ordering::SeqCst) {
            return None;
        }

        let mut pubsub = match timeout(CONNECT_TIMEOUT, client.get_async_pubsub()).await {
            Ok(Ok(pubsub)) => pubsub,
            _ => {
                self.note_failure("pubsub connect failed").await;
                return None;
            }
        };
        if pubsub.subscribe(channel).await.is_err() {
            self.note_failure("subscribe failed").await;
            return None;
        }

        let (tx, rx) = mpsc::channel(64);
        let mut shutdown_rx = self.inner.shutdown.subscribe();
        let channel = channel.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            loop {
                tokio::select! {
                    message = stream.next() => match message {
                        Some(message) => {
                            let payload: String = match message.get_payload() {
                                Ok(payload) => payload,
                                Err(_) => continue,
                            };
                            if tx.send(payload).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::debug!(channel = %channel, "Subscription closed");
        });
        Some(rx)
    }

    /// Hand off asynchronous work: serialize the payload with a
    /// `timestamp` field and publish it on the `"<domain>:<event>"`
    /// channel. Fire-and-forget, at-most-once: this never errors and
    /// never blocks past the per-call timeout.
    pub async fn dispatch(&self, channel: &str, mut payload: serde_json::Value) {
        if let Some(object) = payload.as_object_mut() {
            if !object.contains_key("timestamp") {
                object.insert(
                    "timestamp".to_string(),
                    serde_json::Value::String(Utc::now().to_rfc3339()),
                );
            }
        }

        let body = payload.to_string();
        let delivered = self.publish(channel, &body).await;
        metrics::record_dispatch(delivered);
        if delivered {
            tracing::debug!(channel, "Dispatched event");
        } else {
            tracing::trace!(channel, "Broker degraded; event dropped");
        }
    }
}
