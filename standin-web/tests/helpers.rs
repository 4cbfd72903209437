//! Integration test helpers
//!
//! Spawns the full application on a random loopback port.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use standin_auth::AuthService;
use standin_core::StandinConfig;
use standin_web::{create_app, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", &self.address, path))
            .header(name, value)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_invoke(&self, tier: &str, headers: &[(&str, &str)]) -> reqwest::Response {
        let mut request = self
            .api_client
            .post(format!("{}/api/invoke", &self.address))
            .json(&serde_json::json!({ "tier": tier }));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post_guest_session(&self, body: serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/api/guest/sessions", &self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app(config: StandinConfig) -> TestApp {
    let state = AppState::new(config).expect("Failed to build app state");
    spawn_with_state(state).await
}

pub async fn spawn_app_with_auth(config: StandinConfig, auth: AuthService) -> TestApp {
    spawn_with_state(AppState::with_auth(config, auth)).await
}

async fn spawn_with_state(state: AppState) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let app = create_app(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        api_client,
    }
}

/// Config whose production pattern matches the loopback test host.
pub fn provider_config() -> StandinConfig {
    let mut config = StandinConfig::default();
    config.environment.production_hosts = vec!["127.0.0.1".to_string()];
    config
}

pub fn get_request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header("host", "localhost:4280");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("host", "localhost:4280")
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
