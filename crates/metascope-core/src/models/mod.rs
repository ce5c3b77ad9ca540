//! Data models for the application
//!
//! The only record the pipeline produces is `ImageMetadata`; capture metadata read
//! from embedded EXIF directories is kept in its own struct so the extractor can
//! fill it without touching the rest of the record.

mod image;

// Re-export all models for convenient imports
pub use image::{CaptureMetadata, ImageMetadata, MetadataSource};
