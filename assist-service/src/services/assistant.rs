//! The assistant: two fixed roles over one vision provider.

use crate::services::image::DecodedImage;
use crate::services::providers::{ProviderError, VisionProvider};
use metrics::{counter, histogram};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};

const OBJECT_FINDER_INSTRUCTION: &str = "You are a helpful agent for vision impaired people. \
Your task is to locate the things in the room and provide details \
about how it can be fetched. Let's think step by step.";

const WALKING_ASSISTANT_INSTRUCTION: &str = "You are a walking assistant, you give directions to follow \
based on pictures provided in order to not collide with anything.\
You must give verbose responses in order for the user to react in time to any obstructions in front of them.\
I am a vision impaired. This picture shows what is in front of me. \
Please tell me which way I can safely walk. \
Give me walking directions before you tell me any other information about my surroundings.";

/// Which assistive role a request is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ObjectFinder,
    WalkingAssistant,
}

impl Capability {
    pub fn system_instruction(self) -> &'static str {
        match self {
            Capability::ObjectFinder => OBJECT_FINDER_INSTRUCTION,
            Capability::WalkingAssistant => WALKING_ASSISTANT_INSTRUCTION,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ObjectFinder => "object_finder",
            Capability::WalkingAssistant => "walking_assistant",
        }
    }
}

#[derive(Clone)]
pub struct AssistantClient {
    provider: Arc<dyn VisionProvider>,
    timeout: Duration,
}

impl AssistantClient {
    pub fn new(provider: Arc<dyn VisionProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Locate the object described by `hint` and explain how to reach it.
    pub async fn find_object(
        &self,
        image: &DecodedImage,
        hint: Option<&str>,
    ) -> Result<String, AppError> {
        self.ask(Capability::ObjectFinder, image, hint).await
    }

    /// Safety-first walking directions for a forward-facing photo.
    pub async fn walking_directions(
        &self,
        image: &DecodedImage,
        hint: Option<&str>,
    ) -> Result<String, AppError> {
        self.ask(Capability::WalkingAssistant, image, hint).await
    }

    /// Run one provider call under the configured deadline. The model text is
    /// returned as-is, empty or not.
    pub async fn ask(
        &self,
        capability: Capability,
        image: &DecodedImage,
        hint: Option<&str>,
    ) -> Result<String, AppError> {
        let start = Instant::now();
        let call = self
            .provider
            .complete(capability.system_instruction(), hint, image);

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        };

        histogram!(
            "assistant_upstream_latency_seconds",
            "capability" => capability.as_str()
        )
        .record(start.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        counter!(
            "assistant_requests_total",
            "capability" => capability.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        match result {
            Ok(text) => {
                tracing::info!(
                    capability = capability.as_str(),
                    provider = self.provider.name(),
                    response_len = text.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Assistant answered"
                );
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    capability = capability.as_str(),
                    provider = self.provider.name(),
                    error = %e,
                    "Assistant call failed"
                );
                Err(e.into())
            }
        }
    }

    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.provider.health_check().await
    }
}
