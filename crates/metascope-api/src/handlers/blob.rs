use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use metascope_core::AppError;
use std::sync::Arc;

const BLOB_CACHE_CONTROL: &str = "private, max-age=3600";

/// `GET /blob/{id}`: replay stored upload bytes until they expire.
#[tracing::instrument(skip(state), fields(operation = "get_blob"))]
pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, HttpAppError> {
    let blob = state
        .blobs
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound("Blob not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CACHE_CONTROL, BLOB_CACHE_CONTROL.to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        blob.data,
    )
        .into_response())
}
