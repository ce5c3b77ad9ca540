//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use metascope_core::Config;
use metascope_services::{MetadataService, TransientBlobStore};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    metascope_infra::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let state = build_state(config.clone())?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Build the metadata service and blob store. Must run inside a Tokio runtime, since
/// the blob store starts its sweeper immediately.
pub fn build_state(config: Config) -> Result<Arc<AppState>> {
    let metadata = MetadataService::from_config(&config)?;
    let blobs = TransientBlobStore::new(config.blob_ttl(), config.blob_sweep_interval());

    tracing::debug!(
        max_image_bytes = config.max_image_bytes(),
        fetch_timeout_secs = config.fetch_timeout().as_secs(),
        blob_ttl_secs = config.blob_ttl().as_secs(),
        "Services initialized"
    );

    Ok(Arc::new(AppState::new(config, metadata, blobs)))
}
