use crate::dtos::MessageResponse;
use crate::handlers::form::{file_too_large, UploadForm, UploadedFile};
use crate::services::{decode_image, DecodedImage};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use service_core::error::AppError;

const AUDIO_ACK: &str = "Audio successfully uploaded";

/// Object finder: `image` file plus a `description` of what to look for.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut form = UploadForm::read(multipart, state.config.uploads.max_bytes).await?;
    let file = form.take_file("image")?;
    let description = form.take_text("description").ok_or_else(|| {
        AppError::BadRequest("No description field in the request".to_string())
    })?;
    check_size(&state, &file)?;

    let image = store_and_decode(&state, file).await?;
    let message = state
        .assistant
        .find_object(&image, Some(description.as_str()))
        .await?;

    Ok(Json(MessageResponse::new(message)))
}

/// Walking assistant: `image` file only.
pub async fn upload_walking_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut form = UploadForm::read(multipart, state.config.uploads.max_bytes).await?;
    let file = form.take_file("image")?;
    check_size(&state, &file)?;

    let image = store_and_decode(&state, file).await?;
    let message = state.assistant.walking_directions(&image, None).await?;

    Ok(Json(MessageResponse::new(message)))
}

/// Acknowledges an `audio` upload. Nothing is stored or forwarded.
pub async fn upload_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut form = UploadForm::read(multipart, state.config.uploads.max_bytes).await?;
    let file = form.take_file("audio")?;
    check_size(&state, &file)?;

    tracing::info!(
        file_name = %file.file_name,
        content_type = file.content_type.as_deref().unwrap_or("-"),
        size = file.bytes.len(),
        "Audio upload acknowledged"
    );

    Ok(Json(MessageResponse::new(AUDIO_ACK)))
}

fn check_size(state: &AppState, file: &UploadedFile) -> Result<(), AppError> {
    let limit = state.config.uploads.max_bytes;
    if file.bytes.len() > limit {
        return Err(file_too_large(limit));
    }
    Ok(())
}

/// Persist the upload, then decode the saved file.
async fn store_and_decode(state: &AppState, file: UploadedFile) -> Result<DecodedImage, AppError> {
    let stored = state
        .store
        .save(&file.file_name, &file.bytes)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save upload {}: {}", file.file_name, e);
            e
        })?;

    let data = state.store.read(&stored).await?;

    tokio::task::spawn_blocking(move || decode_image(data))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Image decode task failed: {}", e)))?
        .map_err(|e| {
            tracing::info!(storage_name = %stored.storage_name, "Rejected undecodable upload");
            e
        })
}
