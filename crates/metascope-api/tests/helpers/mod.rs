//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p metascope-api`.

pub mod fixtures;

use axum_test::TestServer;
use metascope_api::setup::{build_state, routes};
use metascope_api::AppState;
use metascope_core::config::MetadataConfig;
use metascope_core::Config;
use std::sync::Arc;

/// Test application: server plus the state behind it.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Small ceilings so size limits are cheap to exercise.
pub fn create_test_config() -> Config {
    let mut inner = MetadataConfig::default();
    inner.max_image_bytes = 64 * 1024;
    inner.max_upload_bytes = 128 * 1024;
    inner.fetch_timeout_secs = 5;
    inner.max_batch_urls = 3;
    Config(Box::new(inner))
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(create_test_config()).await
}

pub async fn setup_test_app_with(config: Config) -> TestApp {
    let state = build_state(config.clone()).expect("Failed to build state");
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");
    TestApp { server, state }
}
