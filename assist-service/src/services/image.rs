//! Decoding of uploaded photos into the payload sent upstream.

use axum::body::Bytes;
use image::{GenericImageView, ImageFormat};
use service_core::error::AppError;
use std::io::Cursor;

/// A validated, in-memory image ready to forward to the model.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Format the upload arrived in.
    pub source_format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// MIME type of `bytes`; differs from the source when re-encoded.
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

/// Inline image types the model accepts as-is.
fn passthrough_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

fn undecodable(err: image::ImageError) -> AppError {
    AppError::BadRequest(format!("Uploaded file is not a decodable image: {}", err))
}

/// Decode `data` fully. JPEG, PNG and WebP keep their original bytes; any
/// other decodable format is re-encoded as PNG.
///
/// CPU-bound: call from `spawn_blocking` in async contexts.
pub fn decode_image(data: Bytes) -> Result<DecodedImage, AppError> {
    let format = image::guess_format(&data).map_err(undecodable)?;
    let img = image::load_from_memory_with_format(&data, format).map_err(undecodable)?;
    let (width, height) = img.dimensions();

    if let Some(mime_type) = passthrough_mime(format) {
        return Ok(DecodedImage {
            source_format: format,
            width,
            height,
            mime_type,
            bytes: data,
        });
    }

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to re-encode image: {}", e)))?;

    tracing::debug!(
        source = ?format,
        width,
        height,
        "Re-encoded upload as PNG"
    );

    Ok(DecodedImage {
        source_format: format,
        width,
        height,
        mime_type: "image/png",
        bytes: Bytes::from(buffer),
    })
}
