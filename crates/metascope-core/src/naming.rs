//! URL and file naming helpers shared by the assembler and the API layer.

use percent_encoding::percent_decode_str;
use reqwest::Url;

/// Trim whitespace and repair single-slash schemes (`https:/host` becomes `https://host`),
/// which appear when a URL travels through a path segment that collapses `//`.
pub fn normalize_url(raw: &str) -> String {
    let normalized = raw.trim();
    for scheme in ["http:/", "https:/"] {
        if let Some(rest) = normalized.strip_prefix(scheme) {
            if !rest.starts_with('/') {
                return format!("{}/{}", scheme, rest);
            }
        }
    }
    normalized.to_string()
}

/// Parse a URL and accept it only if it is absolute http(s) with a host.
pub fn parse_supported_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw).map_err(|e| e.to_string())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("unsupported scheme '{}'", parsed.scheme()));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err("missing host".to_string()),
    }
}

pub fn is_supported_url(raw: &str) -> bool {
    parse_supported_url(raw).is_ok()
}

/// Lower-cased extension of the last path element, without the dot.
pub fn extension_from_name(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) => base[idx + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Decoded last path segment of a URL, or empty when the path has none.
pub fn file_name_from_url(url: &Url) -> String {
    let path = url.path().trim_end_matches('/');
    let segment = path.rsplit('/').next().unwrap_or("");
    if segment.is_empty() || segment == "." {
        return String::new();
    }
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Media type without parameters (`image/png; q=1` becomes `image/png`).
pub fn content_type_base(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Conventional file extension for a decoder format name.
pub fn format_to_extension(format: &str) -> String {
    match format.to_lowercase().as_str() {
        "jpeg" => "jpg".to_string(),
        "tiff" => "tif".to_string(),
        other => other.to_string(),
    }
}
