//! Tolerant extraction of embedded EXIF capture metadata.
//!
//! Each tag is read by its own step; a missing or malformed tag leaves its field
//! unset and never stops the remaining steps.

use std::io::Cursor;

use ::exif::{Exif, In, Reader, Tag, Value};
use metascope_core::CaptureMetadata;

/// Human label for an EXIF orientation value.
pub fn orientation_label(orientation: u32) -> String {
    match orientation {
        1 => "Horizontal (normal)".to_string(),
        2 => "Mirror horizontal".to_string(),
        3 => "Rotate 180".to_string(),
        4 => "Mirror vertical".to_string(),
        5 => "Mirror horizontal and rotate 270 CW".to_string(),
        6 => "Rotate 90 CW".to_string(),
        7 => "Mirror horizontal and rotate 90 CW".to_string(),
        8 => "Rotate 270 CW".to_string(),
        other => format!("Unknown ({})", other),
    }
}

pub fn resolution_unit_label(unit: u32) -> &'static str {
    match unit {
        2 => "inches",
        3 => "centimeters",
        _ => "unknown",
    }
}

/// Read capture metadata from JPEG APP1, TIFF, PNG eXIf or WebP EXIF containers.
///
/// Never fails: bytes without a readable EXIF directory yield an empty result.
pub fn extract_capture_metadata(data: &[u8]) -> CaptureMetadata {
    let mut capture = CaptureMetadata::default();

    let exif = match read_exif(data) {
        Some(exif) => exif,
        None => return capture,
    };

    if let Some(value) = uint_field(&exif, Tag::Orientation) {
        capture.orientation = Some(orientation_label(value));
    }

    if let Some(software) = ascii_field(&exif, Tag::Software) {
        capture.creator_tool = Some(software.clone());
        capture.software = Some(software);
    }

    capture.modify_date = ascii_field(&exif, Tag::DateTime);
    capture.create_date = ascii_field(&exif, Tag::DateTimeOriginal);
    capture.x_resolution = rational_field(&exif, Tag::XResolution);
    capture.y_resolution = rational_field(&exif, Tag::YResolution);

    if let Some(unit) = uint_field(&exif, Tag::ResolutionUnit) {
        capture.resolution_unit = Some(resolution_unit_label(unit).to_string());
    }

    if let Some(color_space) = uint_field(&exif, Tag::ColorSpace) {
        if color_space == 1 {
            capture.color_space = Some("sRGB".to_string());
            capture.color_mode = Some("RGB".to_string());
        } else {
            capture.color_space = Some("Uncalibrated".to_string());
        }
    }

    capture
}

fn read_exif(data: &[u8]) -> Option<Exif> {
    if data.is_empty() {
        return None;
    }

    let mut cursor = Cursor::new(data);
    match Reader::new()
        .continue_on_error(true)
        .read_from_container(&mut cursor)
        .or_else(|e| {
            e.distill_partial_result(|errors| {
                for error in errors {
                    tracing::debug!(error = %error, "Skipping malformed EXIF entry");
                }
            })
        }) {
        Ok(exif) => Some(exif),
        Err(e) => {
            tracing::trace!(error = %e, "No readable EXIF directory");
            None
        }
    }
}

fn uint_field(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    match exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(ref parts) => {
            let text = String::from_utf8_lossy(parts.first()?);
            let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        }
        _ => None,
    }
}

// Integer quotient; a zero denominator drops the tag.
fn rational_field(exif: &Exif, tag: Tag) -> Option<u32> {
    match exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(ref values) => {
            let rational = values.first()?;
            if rational.denom == 0 {
                return None;
            }
            Some(rational.num / rational.denom)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, RgbImage};

    const ASCII: u16 = 2;
    const SHORT: u16 = 3;
    const LONG: u16 = 4;
    const RATIONAL: u16 = 5;

    struct Entry {
        tag: u16,
        kind: u16,
        count: u32,
        value: Vec<u8>,
    }

    fn short(tag: u16, value: u16) -> Entry {
        Entry {
            tag,
            kind: SHORT,
            count: 1,
            value: value.to_le_bytes().to_vec(),
        }
    }

    fn long(tag: u16, value: u32) -> Entry {
        Entry {
            tag,
            kind: LONG,
            count: 1,
            value: value.to_le_bytes().to_vec(),
        }
    }

    fn ascii(tag: u16, text: &str) -> Entry {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        Entry {
            tag,
            kind: ASCII,
            count: value.len() as u32,
            value,
        }
    }

    fn rational(tag: u16, num: u32, denom: u32) -> Entry {
        let mut value = num.to_le_bytes().to_vec();
        value.extend_from_slice(&denom.to_le_bytes());
        Entry {
            tag,
            kind: RATIONAL,
            count: 1,
            value,
        }
    }

    /// Little-endian IFD at `offset`, followed by its out-of-line values.
    fn ifd(entries: &[Entry], offset: u32) -> Vec<u8> {
        let table_len = 2 + 12 * entries.len() as u32 + 4;
        let mut table = (entries.len() as u16).to_le_bytes().to_vec();
        let mut data = Vec::new();

        for entry in entries {
            table.extend_from_slice(&entry.tag.to_le_bytes());
            table.extend_from_slice(&entry.kind.to_le_bytes());
            table.extend_from_slice(&entry.count.to_le_bytes());
            if entry.value.len() <= 4 {
                let mut inline = entry.value.clone();
                inline.resize(4, 0);
                table.extend_from_slice(&inline);
            } else {
                let value_offset = offset + table_len + data.len() as u32;
                table.extend_from_slice(&value_offset.to_le_bytes());
                data.extend_from_slice(&entry.value);
                if data.len() % 2 == 1 {
                    data.push(0);
                }
            }
        }

        table.extend_from_slice(&0u32.to_le_bytes());
        table.extend_from_slice(&data);
        table
    }

    /// TIFF stream with IFD0 plus an Exif sub-IFD.
    fn tiff(mut primary: Vec<Entry>, exif_entries: Vec<Entry>) -> Vec<u8> {
        primary.push(long(0x8769, 0));
        let sized = ifd(&primary, 8);
        let exif_offset = 8 + sized.len() as u32;
        if let Some(pointer) = primary.last_mut() {
            pointer.value = exif_offset.to_le_bytes().to_vec();
        }

        let mut out = b"II".to_vec();
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&ifd(&primary, 8));
        out.extend_from_slice(&ifd(&exif_entries, exif_offset));
        out
    }

    /// Minimal JPEG stream carrying the TIFF block in an APP1 segment.
    fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(tiff);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in bytes {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 == 1 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    /// Real PNG with an eXIf chunk inserted right after IHDR.
    fn png_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();

        let mut chunk = (tiff.len() as u32).to_be_bytes().to_vec();
        let mut typed = b"eXIf".to_vec();
        typed.extend_from_slice(tiff);
        chunk.extend_from_slice(&typed);
        chunk.extend_from_slice(&crc32(&typed).to_be_bytes());

        // Signature (8) + IHDR chunk (4 + 4 + 13 + 4)
        let ihdr_end = 8 + 25;
        let mut out = png[..ihdr_end].to_vec();
        out.extend_from_slice(&chunk);
        out.extend_from_slice(&png[ihdr_end..]);
        out
    }

    /// RIFF/WEBP container with a VP8X header and an EXIF chunk.
    fn webp_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut chunks = b"VP8X".to_vec();
        chunks.extend_from_slice(&10u32.to_le_bytes());
        // EXIF flag, reserved, then 1x1 canvas stored minus one
        chunks.extend_from_slice(&[0x08, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        chunks.extend_from_slice(b"EXIF");
        chunks.extend_from_slice(&(tiff.len() as u32).to_le_bytes());
        chunks.extend_from_slice(tiff);
        if tiff.len() % 2 == 1 {
            chunks.push(0);
        }

        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&(4 + chunks.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WEBP");
        out.extend_from_slice(&chunks);
        out
    }

    fn sample_primary() -> Vec<Entry> {
        vec![
            short(0x0112, 6),
            rational(0x011A, 72, 1),
            rational(0x011B, 600, 2),
            short(0x0128, 2),
            ascii(0x0131, "Darktable 4.6"),
            ascii(0x0132, "2024:01:02 03:04:05"),
        ]
    }

    #[test]
    fn test_extracts_all_known_tags() {
        let data = jpeg_with_exif(&tiff(
            sample_primary(),
            vec![ascii(0x9003, "2023:12:31 23:59:58"), short(0xA001, 1)],
        ));

        let capture = extract_capture_metadata(&data);
        assert_eq!(capture.orientation.as_deref(), Some("Rotate 90 CW"));
        assert_eq!(capture.software.as_deref(), Some("Darktable 4.6"));
        assert_eq!(capture.creator_tool.as_deref(), Some("Darktable 4.6"));
        assert_eq!(capture.modify_date.as_deref(), Some("2024:01:02 03:04:05"));
        assert_eq!(capture.create_date.as_deref(), Some("2023:12:31 23:59:58"));
        assert_eq!(capture.x_resolution, Some(72));
        assert_eq!(capture.y_resolution, Some(300));
        assert_eq!(capture.resolution_unit.as_deref(), Some("inches"));
        assert_eq!(capture.color_space.as_deref(), Some("sRGB"));
        assert_eq!(capture.color_mode.as_deref(), Some("RGB"));
    }

    #[test]
    fn test_zero_denominator_skips_only_that_tag() {
        let data = jpeg_with_exif(&tiff(
            vec![
                short(0x0112, 1),
                rational(0x011A, 72, 0),
                rational(0x011B, 72, 1),
            ],
            vec![short(0xA001, 0xFFFF)],
        ));

        let capture = extract_capture_metadata(&data);
        assert_eq!(capture.x_resolution, None);
        assert_eq!(capture.y_resolution, Some(72));
        assert_eq!(capture.orientation.as_deref(), Some("Horizontal (normal)"));
        assert_eq!(capture.color_space.as_deref(), Some("Uncalibrated"));
        assert_eq!(capture.color_mode, None);
    }

    #[test]
    fn test_mistyped_tags_skip_only_themselves() {
        // Orientation written as text and Software as a number
        let data = jpeg_with_exif(&tiff(
            vec![
                ascii(0x0112, "6"),
                rational(0x011A, 300, 1),
                short(0x0128, 2),
                short(0x0131, 7),
                ascii(0x0132, "2024:05:06 07:08:09"),
            ],
            vec![ascii(0x9003, "2024:05:06 07:00:00"), ascii(0xA001, "sRGB")],
        ));

        let capture = extract_capture_metadata(&data);
        assert_eq!(capture.orientation, None);
        assert_eq!(capture.software, None);
        assert_eq!(capture.creator_tool, None);
        assert_eq!(capture.color_space, None);
        assert_eq!(capture.x_resolution, Some(300));
        assert_eq!(capture.resolution_unit.as_deref(), Some("inches"));
        assert_eq!(capture.modify_date.as_deref(), Some("2024:05:06 07:08:09"));
        assert_eq!(capture.create_date.as_deref(), Some("2024:05:06 07:00:00"));
    }

    #[test]
    fn test_reads_png_exif_chunk() {
        let data = png_with_exif(&tiff(sample_primary(), vec![short(0xA001, 1)]));
        let capture = extract_capture_metadata(&data);
        assert_eq!(capture.orientation.as_deref(), Some("Rotate 90 CW"));
        assert_eq!(capture.software.as_deref(), Some("Darktable 4.6"));
        assert_eq!(capture.y_resolution, Some(300));
        assert_eq!(capture.color_space.as_deref(), Some("sRGB"));
    }

    #[test]
    fn test_reads_webp_exif_chunk() {
        let data = webp_with_exif(&tiff(
            vec![short(0x0112, 8), ascii(0x0131, "GIMP 2.10")],
            vec![],
        ));
        let capture = extract_capture_metadata(&data);
        assert_eq!(capture.orientation.as_deref(), Some("Rotate 270 CW"));
        assert_eq!(capture.software.as_deref(), Some("GIMP 2.10"));
        assert_eq!(capture.x_resolution, None);
    }

    #[test]
    fn test_reads_bare_tiff_container() {
        let data = tiff(vec![short(0x0112, 3), short(0x0128, 3)], vec![]);
        let capture = extract_capture_metadata(&data);
        assert_eq!(capture.orientation.as_deref(), Some("Rotate 180"));
        assert_eq!(capture.resolution_unit.as_deref(), Some("centimeters"));
    }

    #[test]
    fn test_image_without_exif_is_empty() {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();
        assert!(extract_capture_metadata(&png).is_empty());
    }

    #[test]
    fn test_garbage_is_empty() {
        assert!(extract_capture_metadata(b"").is_empty());
        assert!(extract_capture_metadata(b"not an image at all").is_empty());
        assert!(extract_capture_metadata(&[0xFF, 0xD8, 0xFF, 0xE1, 0x00]).is_empty());
    }

    #[test]
    fn test_orientation_labels() {
        assert_eq!(orientation_label(2), "Mirror horizontal");
        assert_eq!(orientation_label(5), "Mirror horizontal and rotate 270 CW");
        assert_eq!(orientation_label(8), "Rotate 270 CW");
        assert_eq!(orientation_label(9), "Unknown (9)");
        assert_eq!(orientation_label(0), "Unknown (0)");
    }

    #[test]
    fn test_resolution_unit_labels() {
        assert_eq!(resolution_unit_label(2), "inches");
        assert_eq!(resolution_unit_label(3), "centimeters");
        assert_eq!(resolution_unit_label(1), "unknown");
    }
}
