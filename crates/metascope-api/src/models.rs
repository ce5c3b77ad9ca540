//! JSON response envelopes.

use metascope_core::ImageMetadata;
use serde::Serialize;

/// Success envelope for every metadata endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    pub data: Vec<ImageMetadata>,
    /// Per-item failures that did not abort the request
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Replay path of the stored upload, `/blob/{id}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
}

impl ApiResponse {
    pub fn records(data: Vec<ImageMetadata>) -> Self {
        Self {
            success: !data.is_empty(),
            data,
            errors: Vec::new(),
            message: None,
            blob_url: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let body = serde_json::to_value(ApiResponse::records(Vec::new())).unwrap();
        assert_eq!(body, serde_json::json!({ "success": false, "data": [] }));
    }

    #[test]
    fn test_blob_url_is_camel_case() {
        let mut response = ApiResponse::records(vec![ImageMetadata::default()]);
        response.blob_url = Some("/blob/abc".to_string());
        let body = serde_json::to_value(response.with_errors(vec!["x".to_string()])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["blobUrl"], "/blob/abc");
        assert_eq!(body["errors"][0], "x");
    }
}
