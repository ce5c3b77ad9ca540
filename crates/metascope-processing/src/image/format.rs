//! Image format detection from magic bytes and header-only geometry.

use std::fmt;
use std::io::Cursor;

use ::image::ImageReader;
use serde::{Deserialize, Serialize};

/// Supported image container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl ImageFormat {
    /// Detect the container format from its magic signature.
    pub fn detect(data: &[u8]) -> Option<Self> {
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }

        // TIFF: II or MM (little/big endian)
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(ImageFormat::Tiff);
        }

        None
    }

    /// Lower-case decoder name reported in the `format` field.
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::WebP => "image/webp",
        }
    }

    fn decoder_format(&self) -> ::image::ImageFormat {
        match self {
            ImageFormat::Jpeg => ::image::ImageFormat::Jpeg,
            ImageFormat::Png => ::image::ImageFormat::Png,
            ImageFormat::Gif => ::image::ImageFormat::Gif,
            ImageFormat::Bmp => ::image::ImageFormat::Bmp,
            ImageFormat::Tiff => ::image::ImageFormat::Tiff,
            ImageFormat::WebP => ::image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("image: empty input")]
    Empty,

    #[error("{detail}")]
    UnsupportedOrCorrupt { detail: String },
}

/// Format and pixel geometry read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Identify the format by signature and read width/height without decoding pixels.
///
/// The declared MIME type and file name never influence the result.
pub fn decode_header(data: &[u8]) -> Result<ImageHeader, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = ImageFormat::detect(data).ok_or_else(|| DecodeError::UnsupportedOrCorrupt {
        detail: "image: unknown format".to_string(),
    })?;

    let (width, height) = ImageReader::with_format(Cursor::new(data), format.decoder_format())
        .into_dimensions()
        .map_err(|e| DecodeError::UnsupportedOrCorrupt {
            detail: format!("{}: {}", format, e),
        })?;

    if width == 0 || height == 0 {
        return Err(DecodeError::UnsupportedOrCorrupt {
            detail: format!("{}: invalid dimensions {}x{}", format, width, height),
        });
    }

    Ok(ImageHeader {
        format,
        width,
        height,
    })
}
