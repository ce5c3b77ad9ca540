//! Route configuration and setup

use crate::error::error_details_middleware;
use crate::handlers::{blob, health, metadata, upload};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use metascope_core::Config;
use metascope_infra::request_id_middleware;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api",
            get(metadata::missing_url).post(metadata::post_metadata),
        )
        .route("/api/{*url}", get(metadata::get_metadata))
        .route("/upload", post(upload::upload))
        .route("/blob/{id}", get(blob::get_blob))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error_details_middleware,
        ))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes()))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metascope_core::config::MetadataConfig;

    fn config_with_origins(origins: &[&str]) -> Config {
        let mut inner = MetadataConfig::default();
        inner.base.cors_origins = origins.iter().map(|o| o.to_string()).collect();
        Config(Box::new(inner))
    }

    #[test]
    fn test_cors_accepts_explicit_origins() {
        assert!(setup_cors(&config_with_origins(&["https://app.example.com"])).is_ok());
        assert!(setup_cors(&config_with_origins(&["*"])).is_ok());
    }

    #[test]
    fn test_cors_rejects_unparsable_origin() {
        assert!(setup_cors(&config_with_origins(&["bad\norigin"])).is_err());
    }
}
