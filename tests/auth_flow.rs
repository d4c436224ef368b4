//! End-to-end authentication and authorization scenarios.

mod common;

use common::{ADMIN_EMAIL, ADMIN_PASSWORD, CUSTOMER_EMAIL, CUSTOMER_PASSWORD};
use fleet_api::auth::TokenService;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_login_returns_token_pair_with_quota_headers() {
    let server = common::spawn_default().await;

    let response = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // The stricter auth limiter annotates login responses, not the
    // general one.
    assert_eq!(common::header(&response, "x-ratelimit-limit"), "10");
    assert_eq!(common::header(&response, "x-ratelimit-remaining"), "9");
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["accessToken"].as_str().is_some());
    assert!(body["refreshToken"].as_str().is_some());
}

#[tokio::test]
async fn test_wrong_password_gets_uniform_envelope() {
    let server = common::spawn_default().await;

    let response = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Unauthorized"));
    assert_eq!(body["code"], json!("INVALID_CREDENTIALS"));
    assert_eq!(body["message"], json!("invalid credentials"));
    assert_eq!(body["path"], json!("/api/auth/login"));
    assert!(body["timestamp"].as_str().is_some());
    assert!(body.get("stack").is_none());
}

#[tokio::test]
async fn test_login_with_empty_fields_is_validation_error() {
    let server = common::spawn_default().await;

    let response = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "", "password": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_me_requires_a_live_token() {
    let server = common::spawn_default().await;

    let anonymous = server
        .client
        .get(server.url("/api/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = anonymous.json().await.unwrap();
    assert_eq!(body["code"], json!("TOKEN_MISSING"));

    let (access, _) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let me = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    let body: serde_json::Value = me.json().await.unwrap();
    assert_eq!(body["subject"], json!("user-admin"));
    assert_eq!(body["role"], json!("admin"));
}

#[tokio::test]
async fn test_refresh_rotates_the_session() {
    let server = common::spawn_default().await;
    let (old_access, old_refresh) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = server
        .client
        .post(server.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let new_access = body["accessToken"].as_str().unwrap().to_string();
    assert_ne!(new_access, old_access);

    // The presented refresh token was consumed by the rotation.
    let replay = server
        .client
        .post(server.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = replay.json().await.unwrap();
    assert_eq!(body["code"], json!("INVALID_SESSION"));

    // The old access token died with the rotation too.
    let stale = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&old_access)
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

    let fresh = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&new_access)
        .send()
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_every_session_of_the_subject() {
    let server = common::spawn_default().await;
    let (access_a, _) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (access_b, refresh_b) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = server
        .client
        .post(server.url("/api/auth/logout"))
        .bearer_auth(&access_a)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["sessionsRevoked"], json!(2));

    // The session from the other device is gone as well.
    let other = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&access_b)
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);

    let refresh = server
        .client
        .post(server.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_b }))
        .send()
        .await
        .unwrap();
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_failure_modes_are_indistinguishable() {
    let server = common::spawn_default().await;

    async fn refresh_failure(
        server: &common::TestServer,
        token: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = server
            .client
            .post(server.url("/api/auth/refresh"))
            .json(&json!({ "refreshToken": token }))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    // A revoked session: rotate once, then replay the consumed token.
    let (_, old_refresh) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let rotated = server
        .client
        .post(server.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(rotated.status(), StatusCode::OK);
    let revoked = refresh_failure(&server, &old_refresh).await;

    // Structurally malformed token.
    let malformed = refresh_failure(&server, "not.a.token").await;

    // Correctly signed but already expired.
    let expired_issuer = TokenService::new(
        common::ACCESS_SECRET,
        common::REFRESH_SECRET,
        chrono::Duration::hours(1),
        chrono::Duration::seconds(-60),
    );
    let expired_token = expired_issuer.issue_refresh_token("user-admin").unwrap();
    let expired = refresh_failure(&server, &expired_token).await;

    for (status, body) in [&revoked, &malformed, &expired] {
        assert_eq!(*status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], json!("INVALID_SESSION"));
        assert_eq!(body["message"], json!("invalid session"));
    }
}

#[tokio::test]
async fn test_customer_cannot_reach_admin_overview() {
    let server = common::spawn_default().await;

    let (customer_access, _) = server.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await;
    let denied = server
        .client
        .get(server.url("/api/admin/overview"))
        .bearer_auth(&customer_access)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = denied.json().await.unwrap();
    assert_eq!(body["code"], json!("FORBIDDEN"));
    assert_eq!(body["path"], json!("/api/admin/overview"));

    let (admin_access, _) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let allowed = server
        .client
        .get(server.url("/api/admin/overview"))
        .bearer_auth(&admin_access)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    let body: serde_json::Value = allowed.json().await.unwrap();
    assert_eq!(body["fleetStatus"], json!("nominal"));
}

#[tokio::test]
async fn test_expired_access_token_is_rejected_as_expired() {
    let server = common::spawn_default().await;

    // Same secrets as the server, negative lifetime: already expired.
    let expired_issuer = TokenService::new(
        common::ACCESS_SECRET,
        common::REFRESH_SECRET,
        chrono::Duration::seconds(-60),
        chrono::Duration::days(7),
    );
    let token = expired_issuer
        .issue_access_token("user-admin", ADMIN_EMAIL, fleet_api::auth::Role::Admin)
        .unwrap();

    let response = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("TOKEN_EXPIRED"));
    assert_eq!(body["message"], json!("token expired"));
}

#[tokio::test]
async fn test_token_signed_with_foreign_secret_is_malformed() {
    let server = common::spawn_default().await;

    let foreign = TokenService::new(
        "some-other-secret",
        common::REFRESH_SECRET,
        chrono::Duration::hours(1),
        chrono::Duration::days(7),
    );
    let token = foreign
        .issue_access_token("user-admin", ADMIN_EMAIL, fleet_api::auth::Role::Admin)
        .unwrap();

    let response = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("TOKEN_MALFORMED"));
}

#[tokio::test]
async fn test_public_status_degrades_to_anonymous() {
    let server = common::spawn_default().await;

    let anonymous = server
        .client
        .get(server.url("/api/public/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::OK);
    let body: serde_json::Value = anonymous.json().await.unwrap();
    assert_eq!(body["authenticated"], json!(false));

    // A garbage token does not fail the request, it just stays anonymous.
    let garbage = server
        .client
        .get(server.url("/api/public/status"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::OK);
    let body: serde_json::Value = garbage.json().await.unwrap();
    assert_eq!(body["authenticated"], json!(false));

    let (access, _) = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let authed = server
        .client
        .get(server.url("/api/public/status"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(authed.status(), StatusCode::OK);
    let body: serde_json::Value = authed.json().await.unwrap();
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["viewer"], json!("user-admin"));
}
