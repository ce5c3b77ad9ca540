//! Metadata assembly.
//!
//! Turns uploaded bytes or a remote URL into one `ImageMetadata` record. Every entry
//! point is total: acquisition and decode failures are written onto the record
//! instead of being returned as errors.

use std::sync::Arc;

use chrono::Utc;
use metascope_core::naming::{
    content_type_base, extension_from_name, file_name_from_url, format_to_extension,
    parse_supported_url,
};
use metascope_core::{Config, ImageMetadata, MetadataSource};
use metascope_processing::{
    aspect_ratio_decimal, aspect_ratio_fraction, decode_header, extract_capture_metadata,
    human_bytes, megapixels,
};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use super::fetch::{format_elapsed, BoundedFetcher, FetchErrorKind, ImageFetcher, ResponseInfo};

pub struct MetadataService {
    fetcher: Arc<dyn ImageFetcher>,
    max_image_bytes: usize,
}

impl MetadataService {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, max_image_bytes: usize) -> Self {
        Self {
            fetcher,
            max_image_bytes,
        }
    }

    /// Build the service with a [`BoundedFetcher`] configured from `config`.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let fetcher = BoundedFetcher::new(config.fetch_timeout())
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self::new(Arc::new(fetcher), config.max_image_bytes()))
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Assemble a record for uploaded bytes. The declared content type and file name
    /// are copied onto the record but never used to pick a decoder.
    #[tracing::instrument(skip(self, data), fields(file_name = %file_name, size = data.len()))]
    pub fn process_upload(&self, data: &[u8], content_type: &str, file_name: &str) -> ImageMetadata {
        if data.is_empty() {
            tracing::debug!("Rejecting empty upload");
            let mut meta = identity(data, content_type, file_name, MetadataSource::Upload);
            meta.fetch_error = Some("file is empty".to_string());
            return meta;
        }

        assemble(data, content_type, file_name, MetadataSource::Upload)
    }

    /// Fetch `raw_url` within the configured ceiling and assemble its record.
    #[tracing::instrument(skip(self, cancel), fields(url = %raw_url))]
    pub async fn process_remote(&self, cancel: &CancellationToken, raw_url: &str) -> ImageMetadata {
        let mut meta = ImageMetadata {
            source: MetadataSource::Remote,
            aspect_ratio: aspect_ratio_decimal(0, 0),
            ..Default::default()
        };

        let url: Url = match parse_supported_url(raw_url) {
            Ok(url) => url,
            Err(reason) => {
                meta.fetch_error = Some(FetchErrorKind::InvalidUrl(reason).to_string());
                return meta;
            }
        };

        meta.final_url = Some(url.to_string());
        meta.file_name = file_name_from_url(&url);
        meta.file_type_extension = extension_from_name(&meta.file_name);

        let fetched = match self.fetcher.fetch(cancel, &url, self.max_image_bytes).await {
            Ok(fetched) => fetched,
            Err(err) => {
                meta.duration = Some(format_elapsed(err.elapsed));
                if let Some(ref response) = err.response {
                    apply_response(&mut meta, response);
                }
                meta.fetch_error = Some(err.to_string());
                return meta;
            }
        };

        let duration = format_elapsed(fetched.elapsed);
        let downloaded_bytes = fetched.data.len() as u64;

        if fetched.data.is_empty() {
            apply_response(&mut meta, &fetched.response);
            meta.duration = Some(duration);
            meta.downloaded_bytes = Some(0);
            meta.fetch_error = Some("empty response".to_string());
            return meta;
        }

        let content_type = fetched.response.content_type.clone().unwrap_or_default();
        let file_name = meta.file_name.clone();
        let data = fetched.data;
        let span = tracing::Span::current();
        let decoded = tokio::task::spawn_blocking(move || {
            span.in_scope(|| assemble(&data, &content_type, &file_name, MetadataSource::Remote))
        })
        .await;

        let mut record = match decoded {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Metadata task failed");
                meta.file_size = downloaded_bytes;
                meta.file_size_human =
                    human_bytes(i64::try_from(downloaded_bytes).unwrap_or(i64::MAX));
                meta.decode_error = Some(format!("metadata task failed: {}", e));
                meta
            }
        };
        apply_response(&mut record, &fetched.response);
        record.downloaded_bytes = Some(downloaded_bytes);
        record.truncated = fetched.truncated;
        record.duration = Some(duration);

        if record.truncated {
            tracing::warn!(
                downloaded_bytes,
                max_bytes = self.max_image_bytes,
                "Remote image exceeded the size ceiling and was truncated"
            );
        }

        record
    }

    /// Process URLs one after another, one record per URL, in input order.
    pub async fn process_remote_batch(
        &self,
        cancel: &CancellationToken,
        urls: &[String],
    ) -> Vec<ImageMetadata> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.process_remote(cancel, url).await);
        }
        results
    }
}

fn identity(
    data: &[u8],
    content_type: &str,
    file_name: &str,
    source: MetadataSource,
) -> ImageMetadata {
    let size = data.len() as u64;
    ImageMetadata {
        file_name: file_name.to_string(),
        file_size: size,
        file_size_human: human_bytes(i64::try_from(size).unwrap_or(i64::MAX)),
        mime_type: content_type_base(content_type),
        file_type_extension: extension_from_name(file_name),
        source,
        uploaded_at: Some(Utc::now()),
        aspect_ratio: aspect_ratio_decimal(0, 0),
        ..Default::default()
    }
}

// Decode, then enrich. A decode failure leaves geometry at zero and skips EXIF.
fn assemble(
    data: &[u8],
    content_type: &str,
    file_name: &str,
    source: MetadataSource,
) -> ImageMetadata {
    let mut meta = identity(data, content_type, file_name, source);

    let header = match decode_header(data) {
        Ok(header) => header,
        Err(e) => {
            tracing::debug!(error = %e, "Image header could not be decoded");
            meta.decode_error = Some(e.to_string());
            return meta;
        }
    };

    let (width, height) = (i64::from(header.width), i64::from(header.height));
    meta.format = header.format.name().to_string();
    meta.file_type = meta.format.to_uppercase();
    meta.width = header.width;
    meta.height = header.height;
    meta.aspect_ratio = aspect_ratio_decimal(width, height);
    meta.aspect_ratio_fraction = aspect_ratio_fraction(width, height);
    meta.megapixels = megapixels(width, height);

    if meta.file_type_extension.is_empty() {
        meta.file_type_extension = format_to_extension(&meta.format);
    }

    meta.capture = extract_capture_metadata(data);
    meta
}

fn apply_response(meta: &mut ImageMetadata, response: &ResponseInfo) {
    meta.status = Some(response.status.clone());
    meta.final_url = Some(response.final_url.clone());
    meta.content_length = Some(
        response
            .content_length
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(-1),
    );
    meta.last_modified = response.last_modified.clone();
    if let Some(ref content_type) = response.content_type {
        meta.mime_type = content_type_base(content_type);
    }
}
