//! Metascope Services Layer
//!
//! This crate is the orchestration layer: it owns the bounded remote fetcher and
//! the metadata assembler, and re-exports the processing and storage pieces so the
//! API crate depends on a single service facade. Keep pipeline coordination here;
//! keep thin HTTP handling in metascope-api.

pub mod services;

pub use metascope_processing::{
    aspect_ratio_decimal, aspect_ratio_fraction, decode_header, extract_capture_metadata,
    human_bytes, megapixels, DecodeError, ImageFormat, ImageHeader,
};
pub use metascope_storage::{StoredBlob, TransientBlobStore};
pub use services::fetch::{
    format_elapsed, BoundedFetcher, FetchError, FetchErrorKind, FetchedImage, ImageFetcher,
    ResponseInfo,
};
pub use services::metadata::MetadataService;
