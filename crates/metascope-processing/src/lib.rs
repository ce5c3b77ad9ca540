//! Metascope Processing Library
//!
//! Header-only format decoding, tolerant EXIF extraction and the pure metric
//! helpers used to enrich a decoded image into a metadata record.

#[cfg(feature = "image")]
pub mod image;
pub mod metrics;

#[cfg(feature = "image")]
pub use self::image::{decode_header, extract_capture_metadata, DecodeError, ImageFormat, ImageHeader};
pub use self::metrics::{aspect_ratio_decimal, aspect_ratio_fraction, human_bytes, megapixels};
