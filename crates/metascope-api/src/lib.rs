//! Metascope API Library
//!
//! HTTP handlers, error rendering, and application setup for the metadata service.

pub mod error;
mod handlers;
pub mod models;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use models::ApiResponse;
pub use state::AppState;
