mod common;

use assist_service::config::UploadNaming;
use assist_service::services::init_metrics;
use assist_service::services::providers::mock::MockVisionProvider;
use assist_service::services::providers::ProviderError;
use assist_service::startup::Application;
use common::test_config;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use uuid::Uuid;

// Initialize metrics once for all tests
static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        let _ = init_metrics();
    });
}

struct SpawnedApp {
    address: String,
    upload_dir: PathBuf,
}

impl SpawnedApp {
    async fn spawn(provider: MockVisionProvider) -> Self {
        let upload_dir = PathBuf::from(format!("target/test-uploads-{}", Uuid::new_v4()));
        let config = test_config(upload_dir.clone(), UploadNaming::Unique);

        let app = Application::build_with_provider(config, Arc::new(provider))
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        Self {
            address,
            upload_dir,
        }
    }

    fn cleanup(&self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

#[tokio::test]
async fn health_check_works() {
    let app = SpawnedApp::spawn(MockVisionProvider::replying("ok")).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "assist-service");

    app.cleanup();
}

#[tokio::test]
async fn readiness_check_works() {
    let app = SpawnedApp::spawn(MockVisionProvider::replying("ok")).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);

    app.cleanup();
}

#[tokio::test]
async fn readiness_fails_when_provider_not_configured() {
    let app = SpawnedApp::spawn(MockVisionProvider::failing(ProviderError::NotConfigured(
        "GOOGLE_API_KEY is empty".into(),
    )))
    .await;
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    app.cleanup();
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_format() {
    ensure_metrics_initialized();
    let app = SpawnedApp::spawn(MockVisionProvider::replying("ok")).await;
    let client = Client::new();

    // Generate at least one labelled request first.
    client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("http_requests_total"));

    app.cleanup();
}
