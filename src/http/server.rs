//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the service context (token service, session store, limiters,
//!   broker gateway) once at startup
//! - Assemble the Axum router and wire the middleware pipeline:
//!   request id → trace → error translator → rate limit → auth → roles
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{optional_auth, require_auth};
use crate::auth::models::{CredentialVerifier, Role};
use crate::auth::session::{MemorySessionStore, SessionStore};
use crate::auth::tokens::TokenService;
use crate::auth::{guard, handlers};
use crate::broker::BrokerGateway;
use crate::config::FleetConfig;
use crate::health;
use crate::http::translator::translate_errors;
use crate::lifecycle::Shutdown;
use crate::security::rate_limit::{rate_limit_middleware, spawn_sweeper, RateLimiter};

/// Roles allowed on the admin subtree.
const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Manager];

/// Service context injected into handlers and middleware.
///
/// Everything here is constructed exactly once at startup; the request
/// pipeline only ever reads these handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FleetConfig>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<dyn SessionStore>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub broker: BrokerGateway,
    pub general_limiter: Arc<RateLimiter>,
    pub auth_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build the full service context and start its background tasks
    /// (window sweeper, broker reconnector).
    pub async fn build(
        config: FleetConfig,
        credentials: Arc<dyn CredentialVerifier>,
        shutdown: &Shutdown,
    ) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.auth));
        let sessions = Arc::new(MemorySessionStore::new(chrono::Duration::seconds(
            config.auth.session_ttl_secs as i64,
        )));
        let broker = BrokerGateway::connect(&config.broker, shutdown).await;

        let general_limiter = Arc::new(RateLimiter::general(&config.rate_limit));
        let auth_limiter = Arc::new(RateLimiter::auth(&config.rate_limit));
        let sweep_every = Duration::from_secs(config.rate_limit.sweep_interval_secs);
        spawn_sweeper(general_limiter.clone(), sweep_every, shutdown);
        spawn_sweeper(auth_limiter.clone(), sweep_every, shutdown);

        // Expired sessions are swept on the same cadence as the
        // rate-limit windows.
        {
            let sessions = sessions.clone();
            let mut rx = shutdown.subscribe();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(sweep_every);
                tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            let removed = sessions.sweep_expired();
                            if removed > 0 {
                                tracing::trace!(removed, "Swept expired sessions");
                            }
                        }
                        _ = rx.recv() => break,
                    }
                }
            });
        }

        Self {
            config: Arc::new(config),
            tokens,
            sessions,
            credentials,
            broker,
            general_limiter,
            auth_limiter,
        }
    }
}

/// Build the router with the complete middleware pipeline.
pub fn app(state: AppState) -> Router {
    // Login and refresh wear the stricter auth limiter on top of the
    // general one.
    let auth_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .layer(from_fn_with_state(
            state.auth_limiter.clone(),
            rate_limit_middleware,
        ));

    let logout_route = Router::new()
        .route("/logout", post(handlers::logout))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .route("/events/{domain}/{event}", post(handlers::dispatch_event))
        .layer(from_fn_with_state(state.clone(), require_auth));

    // Soft-auth: a bad or missing token degrades to anonymous instead
    // of failing the request.
    let public_routes = Router::new()
        .route("/public/status", get(handlers::public_status))
        .layer(from_fn_with_state(state.clone(), optional_auth));

    // Role guard runs inside the auth layer: identity first, then roles.
    let admin_routes = Router::new()
        .route("/admin/overview", get(handlers::admin_overview))
        .layer(from_fn_with_state(ADMIN_ROLES, guard::require_roles))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes.merge(logout_route))
        .nest("/api", protected_routes.merge(admin_routes).merge(public_routes))
        .with_state(state.clone())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(from_fn_with_state(
            state.general_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(from_fn_with_state(state, translate_errors))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP server for the fleet API core.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self { router: app(state) }
    }

    /// Accept connections until the shutdown broadcast fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut rx = shutdown.subscribe();
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = rx.recv().await;
        })
        .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
