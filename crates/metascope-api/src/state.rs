//! Shared application state.

use metascope_core::Config;
use metascope_services::{MetadataService, TransientBlobStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub config: Config,
    pub metadata: Arc<MetadataService>,
    pub blobs: Arc<TransientBlobStore>,
    /// Cancelled on shutdown; in-flight fetches run on child tokens.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, metadata: MetadataService, blobs: TransientBlobStore) -> Self {
        Self {
            config,
            metadata: Arc::new(metadata),
            blobs: Arc::new(blobs),
            shutdown: CancellationToken::new(),
        }
    }
}
