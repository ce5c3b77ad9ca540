//! Upload endpoint and shared multipart helpers.

use crate::error::HttpAppError;
use crate::models::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use metascope_core::constants::{BLOB_ROUTE_PREFIX, OCTET_STREAM};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use metascope_core::{AppError, ImageMetadata};
use metascope_services::ImageFormat;
use std::sync::Arc;

/// One file part of a multipart form.
#[derive(Debug)]
pub struct FormFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A body cut off by the request size limit is a 413, anything else a malformed form.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{}: {}", context, err.body_text()))
    } else {
        AppError::BadRequest(format!("{}: {}", context, err.body_text()))
    }
}

/// Collect every part named `field` in form order.
pub async fn read_file_fields(
    mut multipart: Multipart,
    field: &str,
) -> Result<Vec<FormFile>, AppError> {
    let mut files = Vec::new();

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        if part.name() != Some(field) {
            continue;
        }

        let file_name = part.file_name().unwrap_or("unknown").to_string();
        let content_type = part
            .content_type()
            .map(str::to_string)
            .filter(|ct| !ct.is_empty());
        let data = part
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file data", e))?;

        files.push(FormFile {
            file_name,
            content_type,
            data,
        });
    }

    Ok(files)
}

/// Content type from the signature. Declared types are trusted for presentation only,
/// so this is also what stored blobs are served under.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    ImageFormat::detect(data)
        .map(|format| format.mime_type())
        .unwrap_or(OCTET_STREAM)
}

/// Run one uploaded file through the assembler.
///
/// The inner `Err` carries a per-file rejection reason (too large, empty); the outer
/// one is reserved for failures of the blocking pool itself.
pub async fn process_form_file(
    state: &AppState,
    file: FormFile,
) -> Result<Result<ImageMetadata, String>, HttpAppError> {
    let max_bytes = state.metadata.max_image_bytes();
    if file.data.len() > max_bytes {
        return Ok(Err(format!("File exceeds {} MB limit.", max_bytes >> 20)));
    }
    if file.data.is_empty() {
        return Ok(Err("Uploaded file is empty.".to_string()));
    }

    let content_type = file
        .content_type
        .unwrap_or_else(|| sniff_content_type(&file.data).to_string());

    let metadata = state.metadata.clone();
    let meta = tokio::task::spawn_blocking(move || {
        metadata.process_upload(&file.data, &content_type, &file.file_name)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Metadata task failed: {}", e)))?;

    Ok(Ok(meta))
}

/// `POST /upload`: extract metadata from one `file` part and keep the bytes for replay.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload"))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse>, HttpAppError> {
    let mut files = read_file_fields(multipart, "file").await?;
    if files.len() > 1 {
        return Err(AppError::InvalidInput(
            "Multiple file fields are not allowed; send exactly one field named 'file'"
                .to_string(),
        )
        .into());
    }
    let file = files
        .pop()
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    let data = file.data.clone();
    let meta = match process_form_file(&state, file).await? {
        Ok(meta) => meta,
        Err(reason) if data.is_empty() => return Err(AppError::InvalidInput(reason).into()),
        Err(reason) => return Err(AppError::PayloadTooLarge(reason).into()),
    };

    let content_type = sniff_content_type(&data).to_string();
    let blob_id = state.blobs.put(data, content_type).await;

    tracing::info!(
        blob_id = %blob_id,
        file_name = %meta.file_name,
        format = %meta.format,
        decoded = meta.is_decoded(),
        "Upload processed"
    );

    let mut response = ApiResponse::records(vec![meta]);
    response.blob_url = Some(format!("{}{}", BLOB_ROUTE_PREFIX, blob_id));
    if let Some(ref decode_error) = response.data[0].decode_error {
        response.message = Some(format!("Stored, but not decodable: {}", decode_error));
    }

    Ok(Json(response))
}
