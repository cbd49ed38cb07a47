use assist_service::config::AssistConfig;
use assist_service::services::init_metrics;
use assist_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize metrics recorder (must be before any metrics are recorded)
    if let Err(e) = init_metrics() {
        eprintln!("{}", e);
    }

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing("assist-service", "info", otlp_endpoint.as_deref());

    let config = AssistConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    let result = app.run_until_stopped().await;
    shutdown_tracing();
    result
}
