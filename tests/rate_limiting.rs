//! Fixed-window rate limiting over real HTTP.

mod common;

use common::{ADMIN_EMAIL, ADMIN_PASSWORD};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_general_quota_denies_after_limit_and_resets() {
    let mut config = common::test_config();
    config.rate_limit.max_requests = 3;
    config.rate_limit.window_secs = 2;
    let server = common::spawn(config).await;

    for expected_remaining in ["2", "1", "0"] {
        let response = server
            .client
            .get(server.url("/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(common::header(&response, "x-ratelimit-limit"), "3");
        assert_eq!(
            common::header(&response, "x-ratelimit-remaining"),
            expected_remaining
        );
    }

    let denied = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(common::header(&denied, "x-ratelimit-remaining"), "0");
    let retry_after: u64 = common::header(&denied, "retry-after").parse().unwrap();
    assert!(retry_after >= 1 && retry_after <= 2);

    let body: serde_json::Value = denied.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Too Many Requests"));
    assert_eq!(body["code"], json!("RATE_LIMITED"));
    assert_eq!(body["path"], json!("/health"));

    // A fresh window opens once the boundary passes.
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    let fresh = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
    assert_eq!(common::header(&fresh, "x-ratelimit-remaining"), "2");
}

#[tokio::test]
async fn test_auth_limiter_is_stricter_than_general() {
    let mut config = common::test_config();
    config.rate_limit.auth.max_requests = 2;
    config.rate_limit.auth.window_secs = 60;
    let server = common::spawn(config).await;

    // Failed logins count against the window just like successes.
    for _ in 0..2 {
        let response = server
            .client
            .post(server.url("/api/auth/login"))
            .json(&json!({ "email": ADMIN_EMAIL, "password": "nope" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(common::header(&response, "x-ratelimit-limit"), "2");
    }

    let denied = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(common::header(&denied, "x-ratelimit-limit"), "2");
    let retry_after: u64 = common::header(&denied, "retry-after").parse().unwrap();
    assert!(retry_after <= 60);
}

#[tokio::test]
async fn test_eleventh_login_in_window_is_limited() {
    // Default auth window: 10 logins per 5 minutes.
    let server = common::spawn_default().await;

    for _ in 0..10 {
        let response = server
            .client
            .post(server.url("/api/auth/login"))
            .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let denied = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = common::header(&denied, "retry-after").parse().unwrap();
    let body: serde_json::Value = denied.json().await.unwrap();
    assert_eq!(body["code"], json!("RATE_LIMITED"));
    assert!(retry_after <= 300);
}
