//! Image inspection module
//!
//! - Format sniffing and header-only geometry (format)
//! - Embedded capture metadata (exif)

pub mod exif;
pub mod format;

pub use self::exif::{extract_capture_metadata, orientation_label, resolution_unit_label};
pub use self::format::{decode_header, DecodeError, ImageFormat, ImageHeader};
