//! Mock login emulation and the provider/mock boundary over real HTTP

mod helpers;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use helpers::{provider_config, spawn_app};
use reqwest::StatusCode;
use standin_core::StandinConfig;
use standin_web::MOCK_MARKER_HEADER;

#[tokio::test]
async fn login_sets_override_cookie_and_redirects() {
    let app = spawn_app(StandinConfig::default()).await;

    let response = app
        .get("/.auth/login/admin?post_login_redirect_uri=/dashboard")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/dashboard");
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("standin_mock_mode=admin;"), "{cookie}");

    let response = app
        .get_with_header("/.auth/me", "cookie", "standin_mock_mode=admin")
        .await;
    assert_eq!(response.headers()[MOCK_MARKER_HEADER], "admin");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["clientPrincipal"]["userId"], "mock-admin-0001");
}

#[tokio::test]
async fn login_rejects_unknown_mode_and_foreign_redirects() {
    let app = spawn_app(StandinConfig::default()).await;

    let response = app.get("/.auth/login/root").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .get("/.auth/login/user?post_login_redirect_uri=https://evil.example/")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
}

#[tokio::test]
async fn logout_resets_to_anonymous() {
    let app = spawn_app(StandinConfig::default()).await;

    let response = app
        .get_with_header("/.auth/logout", "cookie", "standin_mock_mode=user")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("standin_mock_mode=anonymous;"), "{cookie}");
}

#[tokio::test]
async fn client_address_comes_from_socket_peer() {
    let app = spawn_app(StandinConfig::default()).await;

    let response = app.get("/api/usage").await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["usage"]["anonymous_key"], "ip:127.0.0.1");
}

#[tokio::test]
async fn provider_mode_hides_mock_surface() {
    let app = spawn_app(provider_config()).await;

    let response = app.get("/.auth/login/admin").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(MOCK_MARKER_HEADER).is_none());

    let response = app.get("/.auth/logout").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .get_with_header("/.auth/me", "x-standin-mock-mode", "admin")
        .await;
    assert!(response.headers().get(MOCK_MARKER_HEADER).is_none());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["clientPrincipal"], serde_json::Value::Null);
}

#[tokio::test]
async fn provider_principal_is_echoed() {
    let app = spawn_app(provider_config()).await;
    let principal = serde_json::json!({
        "identityProvider": "aad",
        "userId": "aad-7781",
        "userDetails": "grace@example.net",
        "userRoles": ["anonymous", "authenticated"]
    });
    let encoded = STANDARD.encode(principal.to_string());

    let response = app
        .get_with_header("/.auth/me", "x-ms-client-principal", &encoded)
        .await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["clientPrincipal"]["userId"], "aad-7781");
    assert_eq!(body["clientPrincipal"]["identityProvider"], "aad");

    let response = app
        .get_with_header("/api/auth/me", "x-ms-client-principal", &encoded)
        .await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["mode"], "provider");
    assert_eq!(body["role"]["role"], "user");
    assert_eq!(body["role"]["resolved_via"], "header");
}

#[tokio::test]
async fn malformed_principal_fails_closed() {
    let app = spawn_app(provider_config()).await;

    let response = app
        .get_with_header("/api/auth/me", "x-ms-client-principal", "%%%garbage")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["identity"]["caller_id"], serde_json::Value::Null);
    assert_eq!(body["role"]["role"], "anonymous");

    let response = app
        .post_invoke("advanced", &[("x-ms-client-principal", "%%%garbage")])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn guest_session_quota_over_http() {
    let app = spawn_app(StandinConfig::default()).await;
    let response = app.post_guest_session(serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let session: serde_json::Value = response.json().await.unwrap();
    let session_id = session["session_id"].as_str().unwrap().to_string();

    for _ in 0..5 {
        let response = app
            .post_invoke("basic", &[("x-guest-session", session_id.as_str())])
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .post_invoke("basic", &[("x-guest-session", session_id.as_str())])
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Plain anonymous traffic from the same address is a separate key
    let response = app.post_invoke("basic", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deployed_server_ignores_local_host_override() {
    let mut config = StandinConfig::default();
    config.environment.production_hosts = vec!["*.example.net".to_string()];
    let app = spawn_app(config).await;

    let response = app
        .get_with_header("/.auth/me", "x-standin-mock-mode", "admin")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(MOCK_MARKER_HEADER).is_none());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["clientPrincipal"], serde_json::Value::Null);

    let response = app.get("/.auth/login/admin").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
