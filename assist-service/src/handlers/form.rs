//! Multipart parsing for the upload endpoints.

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::http::StatusCode;
use service_core::error::AppError;
use std::collections::HashMap;

/// A multipart part that carried a `filename` parameter or a Content-Type.
#[derive(Debug)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    /// False when the part only had a Content-Type; such a part may still be
    /// a typed text field.
    pub has_file_name: bool,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// The 413 body for an upload above `max_bytes`, wherever it is detected.
pub fn file_too_large(max_bytes: usize) -> AppError {
    AppError::PayloadTooLarge(format!("File too large (max {} bytes)", max_bytes))
}

/// Every part of a multipart request, split into file parts and text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain the request body. A request that is not multipart at all yields
    /// an empty form, so it fails the same presence checks as a form that
    /// simply lacks the part. A body cut off by the request limit reports
    /// `max_bytes`.
    pub async fn read(
        multipart: Result<Multipart, MultipartRejection>,
        max_bytes: usize,
    ) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        let mut multipart = match multipart {
            Ok(multipart) => multipart,
            Err(rejection) => {
                tracing::debug!("Request is not multipart: {}", rejection);
                return Ok(form);
            }
        };

        let to_app_error = |err: MultipartError| multipart_error(err, max_bytes);

        while let Some(field) = multipart.next_field().await.map_err(to_app_error)? {
            let name = field.name().unwrap_or_default().to_string();

            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            // Browsers send an empty `filename=""` with a Content-Type when no
            // file was picked, so a Content-Type alone keeps the part as a file
            // part. `take_text` can still claim it as a typed text field.
            if file_name.is_some() || content_type.is_some() {
                let bytes = field.bytes().await.map_err(to_app_error)?;
                form.files.push(UploadedFile {
                    field: name,
                    has_file_name: file_name.is_some(),
                    file_name: file_name.unwrap_or_default(),
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await.map_err(to_app_error)?;
                // First occurrence wins for repeated fields.
                form.fields.entry(name).or_insert(value);
            }
        }

        Ok(form)
    }

    /// Take the file part named `field`, rejecting a missing part or an empty
    /// file name with the messages the browser client expects.
    pub fn take_file(&mut self, field: &str) -> Result<UploadedFile, AppError> {
        let index = self
            .files
            .iter()
            .position(|f| f.field == field)
            .ok_or_else(|| AppError::BadRequest(format!("No {} part in the request", field)))?;

        let file = self.files.swap_remove(index);
        if file.file_name.is_empty() {
            return Err(AppError::BadRequest("No selected file".to_string()));
        }

        Ok(file)
    }

    /// Take the text field `field`. A same-named part that had a Content-Type
    /// but no `filename` parameter counts too, if its bytes are UTF-8.
    pub fn take_text(&mut self, field: &str) -> Option<String> {
        if let Some(value) = self.fields.remove(field) {
            return Some(value);
        }

        let index = self.files.iter().position(|f| {
            f.field == field && !f.has_file_name && std::str::from_utf8(&f.bytes).is_ok()
        })?;
        let part = self.files.swap_remove(index);
        String::from_utf8(part.bytes.to_vec()).ok()
    }
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        file_too_large(max_bytes)
    } else {
        AppError::BadRequest(format!("Invalid multipart request: {}", err.body_text()))
    }
}
