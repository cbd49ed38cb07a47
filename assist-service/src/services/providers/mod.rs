//! Vision model provider abstractions and implementations.
//!
//! The assistant only needs one thing from a model: given a system
//! instruction, an optional hint and an image, produce text. Keeping the
//! seam that narrow lets tests swap Gemini for the mock.

pub mod gemini;
pub mod mock;

use crate::services::image::DecodedImage;
use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::Timeout(_) => "timeout",
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ApiError(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::ContentFiltered => AppError::BadGateway(err.to_string()),
            ProviderError::NotConfigured(_)
            | ProviderError::RateLimited
            | ProviderError::NetworkError(_)
            | ProviderError::Timeout(_) => AppError::UpstreamUnavailable(err.to_string()),
        }
    }
}

/// A multimodal model that answers a single image-plus-text question.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Run one completion and return the model text unchanged.
    async fn complete(
        &self,
        system_instruction: &str,
        hint: Option<&str>,
        image: &DecodedImage,
    ) -> Result<String, ProviderError>;

    /// Cheap readiness check; must not call the model.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
