//! Mock provider implementation for testing.

use super::{ProviderError, VisionProvider};
use crate::services::image::DecodedImage;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// One call observed by [`MockVisionProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub system_instruction: String,
    pub hint: Option<String>,
    pub mime_type: String,
    pub image_bytes: usize,
}

/// Mock vision provider that records every call it receives.
pub struct MockVisionProvider {
    reply: Result<String, ProviderError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockVisionProvider {
    /// Answer every call with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        system_instruction: &str,
        hint: Option<&str>,
        image: &DecodedImage,
    ) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system_instruction: system_instruction.to_string(),
                hint: hint.map(str::to_string),
                mime_type: image.mime_type.to_string(),
                image_bytes: image.bytes.len(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply.clone()
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.reply {
            Err(ProviderError::NotConfigured(msg)) => {
                Err(ProviderError::NotConfigured(msg.clone()))
            }
            _ => Ok(()),
        }
    }
}
