//! Remote and batch metadata endpoints.

use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::upload::{process_form_file, read_file_fields};
use crate::models::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, Uri},
    Json,
};
use metascope_core::naming::{normalize_url, parse_supported_url};
use metascope_core::AppError;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UrlBatch {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// `GET /api/{*url}`: metadata for one remote image.
///
/// The target URL is taken verbatim from the path, with the request's own query
/// string re-attached, so `/api/https://host/a.png?w=1` fetches `https://host/a.png?w=1`.
#[tracing::instrument(skip(state, uri), fields(operation = "get_metadata"))]
pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    uri: Uri,
) -> Result<Json<ApiResponse>, HttpAppError> {
    let mut target = normalize_url(&target);
    if target.is_empty() {
        return Err(url_required());
    }
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }

    let url = parse_supported_url(&target)
        .map_err(|reason| AppError::InvalidUrl(format!("Invalid URL: {}", reason)))?;

    let cancel = state.shutdown.child_token();
    let meta = state.metadata.process_remote(&cancel, url.as_str()).await;

    if let Some(ref fetch_error) = meta.fetch_error {
        return Err(AppError::Upstream(fetch_error.clone()).into());
    }

    Ok(Json(ApiResponse::records(vec![meta])))
}

/// `GET /api` with no target.
pub async fn missing_url() -> HttpAppError {
    url_required()
}

/// `POST /api`: a JSON URL batch or a multipart set of `files`.
#[tracing::instrument(skip(state, request), fields(operation = "post_metadata"))]
pub async fn post_metadata(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<ApiResponse>, HttpAppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not parse multipart form: {}", e)))?;
        return process_files(&state, multipart).await;
    }

    if content_type.starts_with("application/json") {
        let ValidatedJson(batch) = ValidatedJson::<UrlBatch>::from_request(request, &state).await?;
        return process_urls(&state, batch.urls).await;
    }

    Err(AppError::BadRequest(
        "Content-Type must be application/json or multipart/form-data".to_string(),
    )
    .into())
}

async fn process_urls(
    state: &AppState,
    urls: Vec<String>,
) -> Result<Json<ApiResponse>, HttpAppError> {
    if urls.is_empty() {
        return Err(AppError::InvalidInput("No URLs provided".to_string()).into());
    }
    let max_urls = state.config.max_batch_urls();
    if urls.len() > max_urls {
        return Err(AppError::InvalidInput(format!(
            "Too many URLs: at most {} per request",
            max_urls
        ))
        .into());
    }

    let mut accepted = Vec::with_capacity(urls.len());
    let mut errors = Vec::new();
    for raw in &urls {
        let normalized = normalize_url(raw);
        match parse_supported_url(&normalized) {
            Ok(url) => accepted.push((raw, url.to_string())),
            Err(_) => errors.push(format!("Invalid URL: {}", raw)),
        }
    }

    let targets: Vec<String> = accepted.iter().map(|(_, url)| url.clone()).collect();
    let cancel = state.shutdown.child_token();
    let records = state
        .metadata
        .process_remote_batch(&cancel, &targets)
        .await;

    for ((raw, _), meta) in accepted.iter().zip(&records) {
        if let Some(ref fetch_error) = meta.fetch_error {
            errors.push(format!("{}: {}", raw, fetch_error));
        }
    }

    tracing::info!(
        requested = urls.len(),
        processed = records.len(),
        failed = errors.len(),
        "URL batch processed"
    );

    Ok(Json(ApiResponse::records(records).with_errors(errors)))
}

async fn process_files(
    state: &Arc<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse>, HttpAppError> {
    let files = read_file_fields(multipart, "files").await?;
    if files.is_empty() {
        return Err(AppError::InvalidInput("No files provided".to_string()).into());
    }

    let mut records = Vec::with_capacity(files.len());
    let mut errors = Vec::new();
    for file in files {
        let file_name = file.file_name.clone();
        match process_form_file(state, file).await? {
            Ok(meta) => {
                if let Some(ref decode_error) = meta.decode_error {
                    errors.push(format!("{}: decode error: {}", file_name, decode_error));
                } else {
                    records.push(meta);
                }
            }
            Err(reason) => errors.push(format!("{}: {}", file_name, reason)),
        }
    }

    if records.is_empty() {
        tracing::debug!(errors = ?errors, "No uploaded file could be processed");
        return Err(AppError::ImageProcessing("No valid images processed".to_string()).into());
    }

    Ok(Json(ApiResponse::records(records).with_errors(errors)))
}

fn url_required() -> HttpAppError {
    AppError::InvalidUrl("URL parameter is required".to_string()).into()
}
