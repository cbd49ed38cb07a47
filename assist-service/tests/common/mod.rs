#![allow(dead_code)]

use assist_service::config::{
    AssistConfig, GenaiSettings, GoogleConfig, UploadNaming, UploadSettings, WebSettings,
};
use assist_service::services::providers::mock::MockVisionProvider;
use assist_service::startup::{build_router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageFormat, RgbImage};
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "assist-test-boundary";

pub fn test_config(upload_dir: PathBuf, naming: UploadNaming) -> AssistConfig {
    AssistConfig {
        common: CoreConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0, // Random port for testing
        },
        google: GoogleConfig {
            api_key: Secret::new("test-api-key".to_string()),
        },
        genai: GenaiSettings {
            model: "gemini-1.5-pro-latest".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 5,
        },
        uploads: UploadSettings {
            dir: upload_dir,
            naming,
            max_bytes: 64 * 1024,
            retention_secs: 0,
            sweep_interval_secs: 60,
        },
        web: WebSettings {
            static_dir: PathBuf::from("static"),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockVisionProvider>,
    pub upload_dir: PathBuf,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl TestApp {
    pub fn new(naming: UploadNaming) -> Self {
        Self::with_provider(naming, MockVisionProvider::replying("Mock assistant answer"))
    }

    pub fn with_provider(naming: UploadNaming, provider: MockVisionProvider) -> Self {
        Self::build(naming, provider, |_| {})
    }

    pub fn build(
        naming: UploadNaming,
        provider: MockVisionProvider,
        configure: impl FnOnce(&mut AssistConfig),
    ) -> Self {
        let upload_dir = PathBuf::from(format!("target/test-uploads-{}", Uuid::new_v4()));
        let mut config = test_config(upload_dir.clone(), naming);
        configure(&mut config);
        let provider = Arc::new(provider);
        let state = AppState::new(config, provider.clone());

        Self {
            router: build_router(state),
            provider,
            upload_dir,
        }
    }

    pub async fn post_multipart(&self, path: &str, parts: &[FormPart]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Names of the files currently in the upload directory.
    pub fn stored_files(&self) -> Vec<String> {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn cleanup(&self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub enum FormPart {
    File {
        name: &'static str,
        file_name: &'static str,
        content_type: &'static str,
        bytes: Vec<u8>,
    },
    Text {
        name: &'static str,
        value: &'static str,
    },
    /// A text field that also carries a Content-Type, as `curl -F "k=v;type=..."` sends.
    TypedText {
        name: &'static str,
        content_type: &'static str,
        value: &'static str,
    },
}

impl FormPart {
    pub fn image(file_name: &'static str, bytes: Vec<u8>) -> Self {
        FormPart::File {
            name: "image",
            file_name,
            content_type: "image/png",
            bytes,
        }
    }

    pub fn audio(file_name: &'static str) -> Self {
        FormPart::File {
            name: "audio",
            file_name,
            content_type: "audio/wav",
            bytes: b"RIFF\x00\x00\x00\x00WAVE".to_vec(),
        }
    }

    pub fn text(name: &'static str, value: &'static str) -> Self {
        FormPart::Text { name, value }
    }
}

pub fn multipart_body(parts: &[FormPart]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                body.extend_from_slice(bytes);
            }
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::TypedText {
                name,
                content_type,
                value,
            } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A small solid-colour PNG.
pub fn png_bytes(shade: u8) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade])));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}
