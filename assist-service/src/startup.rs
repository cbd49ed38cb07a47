//! Application startup and lifecycle management.

use crate::config::AssistConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiVisionProvider};
use crate::services::providers::VisionProvider;
use crate::services::{AssistantClient, LocalUploadStore, UploadStore, UploadSweeper};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{http_request_span, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart framing and the text fields on top of the file cap.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AssistConfig,
    pub store: Arc<dyn UploadStore>,
    pub assistant: AssistantClient,
}

impl AppState {
    pub fn new(config: AssistConfig, provider: Arc<dyn VisionProvider>) -> Self {
        let store: Arc<dyn UploadStore> = Arc::new(LocalUploadStore::new(
            config.uploads.dir.clone(),
            config.uploads.naming,
        ));
        let assistant = AssistantClient::new(provider, config.genai.timeout());

        Self {
            config,
            store,
            assistant,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .uploads
        .max_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // The browser client may be served from another origin.
    let uploads = Router::new()
        .route("/upload-image", post(handlers::upload_image))
        .route("/upload-walking-image", post(handlers::upload_walking_image))
        .route("/upload-audio", post(handlers::upload_audio))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ));

    Router::new()
        .route("/", get(handlers::search_assistant))
        .route("/SearchAssistant", get(handlers::search_assistant))
        .route("/WalkingAssistant", get(handlers::walking_assistant))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(uploads)
        .nest_service("/static", ServeDir::new(&state.config.web.static_dir))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the Gemini provider from `config`.
    pub async fn build(config: AssistConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig {
            api_key: config.google.api_key.clone(),
            model: config.genai.model.clone(),
            api_base: config.genai.api_base.clone(),
            timeout: config.genai.timeout(),
        };
        let provider: Arc<dyn VisionProvider> =
            Arc::new(GeminiVisionProvider::new(gemini_config).map_err(AppError::from)?);

        tracing::info!(
            model = %config.genai.model,
            "Initialized Gemini vision provider"
        );

        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an explicit provider (port 0 = random port for testing).
    pub async fn build_with_provider(
        config: AssistConfig,
        provider: Arc<dyn VisionProvider>,
    ) -> Result<Self, AppError> {
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            upload_dir = %config.uploads.dir.display(),
            naming = ?config.uploads.naming,
            "Assist service listening"
        );

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, provider),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C / SIGTERM, running the upload sweeper alongside.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let shutdown_token = CancellationToken::new();

        let uploads = &self.state.config.uploads;
        let sweeper = UploadSweeper::new(
            self.state.store.clone(),
            uploads.retention(),
            uploads.sweep_interval(),
            shutdown_token.clone(),
        );
        let sweeper_handle = tokio::spawn(sweeper.start());

        let router = build_router(self.state);
        let server_token = shutdown_token.clone();
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {},
                    _ = server_token.cancelled() => {},
                }
            })
            .await;

        shutdown_token.cancel();
        if let Err(e) = sweeper_handle.await {
            tracing::warn!("Upload sweeper task failed: {}", e);
        }

        result.map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            e
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
