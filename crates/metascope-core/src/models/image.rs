use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the bytes of a record came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    #[default]
    Upload,
    Remote,
}

/// Capture metadata read from an embedded EXIF directory.
///
/// Every field is independent: a tag that is missing or malformed leaves its field
/// unset without affecting the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_resolution: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_resolution: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<String>,
}

impl CaptureMetadata {
    pub fn is_empty(&self) -> bool {
        self == &CaptureMetadata::default()
    }
}

/// The assembled metadata record for one image.
///
/// A record is always produced, even when acquisition or decoding fails; in that
/// case `fetch_error` or `decode_error` carries the reason and geometry stays zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    // Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_size_human: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_type_extension: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    pub source: MetadataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,

    // Geometry
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aspect_ratio_fraction: String,
    pub megapixels: f64,

    #[serde(flatten)]
    pub capture: CaptureMetadata,

    // Remote fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        rename = "finalURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    // Failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

impl ImageMetadata {
    /// A record that carries an acquisition or decode failure.
    pub fn is_degraded(&self) -> bool {
        self.fetch_error.is_some() || self.decode_error.is_some()
    }

    /// Whether the record reached a successful decode.
    pub fn is_decoded(&self) -> bool {
        self.decode_error.is_none() && self.width > 0 && self.height > 0
    }
}
