//! Shared harness for the integration tests.
//!
//! Boots a real server on an ephemeral port with seeded credentials and
//! returns a handle for driving it over HTTP. Each test gets its own
//! server so rate-limit windows and sessions never bleed across tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use fleet_api::auth::{Role, StaticCredentialVerifier};
use fleet_api::http::app;
use fleet_api::{AppState, FleetConfig, Shutdown};

pub const ADMIN_EMAIL: &str = "admin@fleet.example";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const CUSTOMER_EMAIL: &str = "customer@fleet.example";
pub const CUSTOMER_PASSWORD: &str = "customer-password";

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Log in and return the `(access, refresh)` token pair.
    pub async fn login(&self, email: &str, password: &str) -> (String, String) {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.expect("login body");
        (
            body["accessToken"]
                .as_str()
                .expect("accessToken")
                .to_string(),
            body["refreshToken"]
                .as_str()
                .expect("refreshToken")
                .to_string(),
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Stops the sweeper and broker tasks along with the listener.
        self.shutdown.trigger();
    }
}

/// Default config with test secrets; tests tighten limits as needed.
pub fn test_config() -> FleetConfig {
    let mut config = FleetConfig::default();
    config.auth.access_secret = ACCESS_SECRET.to_string();
    config.auth.refresh_secret = REFRESH_SECRET.to_string();
    config
}

pub async fn spawn(config: FleetConfig) -> TestServer {
    let shutdown = Shutdown::new();

    let credentials = Arc::new(StaticCredentialVerifier::new());
    credentials.add_user(ADMIN_EMAIL, ADMIN_PASSWORD, "user-admin", Role::Admin);
    credentials.add_user(
        CUSTOMER_EMAIL,
        CUSTOMER_PASSWORD,
        "user-customer",
        Role::Customer,
    );

    let state = AppState::build(config, credentials, &shutdown).await;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let router = app(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("server task");
    });

    TestServer {
        addr,
        client: reqwest::Client::new(),
        shutdown,
    }
}

pub async fn spawn_default() -> TestServer {
    spawn(test_config()).await
}

/// Read a response header as a string, empty if absent.
pub fn header(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
