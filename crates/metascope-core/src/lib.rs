//! Metascope Core Library
//!
//! This crate provides the metadata record, error types, configuration and naming
//! helpers that are shared across all Metascope components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{CaptureMetadata, ImageMetadata, MetadataSource};
