//! Bounded remote image acquisition.
//!
//! One GET per call, an absolute client timeout, a byte ceiling enforced while the
//! body streams in, and cancellation through the caller's token.

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use metascope_core::constants::USER_AGENT;
use reqwest::{header, Url};
use tokio_util::sync::CancellationToken;

/// Status line and diagnostic headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    /// Status line, e.g. `404 Not Found`
    pub status: String,
    pub status_code: u16,
    /// URL after redirects
    pub final_url: String,
    pub content_type: Option<String>,
    /// Declared `Content-Length`, if any
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
}

impl ResponseInfo {
    fn from_response(response: &reqwest::Response) -> Self {
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Self {
            status: response.status().to_string(),
            status_code: response.status().as_u16(),
            final_url: response.url().to_string(),
            content_type: header_value(header::CONTENT_TYPE),
            content_length: response.content_length(),
            last_modified: header_value(header::LAST_MODIFIED),
        }
    }
}

/// A successfully acquired body, possibly cut at the byte ceiling.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub data: Bytes,
    pub truncated: bool,
    pub response: ResponseInfo,
    /// Dispatch to end of body read, rounded to milliseconds
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchErrorKind {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch error: {0}")]
    Transport(String),

    #[error("fetch error: request cancelled")]
    Cancelled,

    #[error("HTTP {code}: {status}")]
    HttpStatus { code: u16, status: String },

    #[error("read error: {0}")]
    Read(String),
}

/// Acquisition failure with whatever the server told us before it happened.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    /// Present once a response head was received
    pub response: Option<ResponseInfo>,
    pub elapsed: Duration,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// GET `url`, keeping at most `max_bytes` of the body.
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        url: &Url,
        max_bytes: usize,
    ) -> Result<FetchedImage, FetchError>;
}

/// reqwest-backed fetcher with a fixed timeout and identifying User-Agent.
#[derive(Clone)]
pub struct BoundedFetcher {
    client: reqwest::Client,
}

impl BoundedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn execute(
        &self,
        url: &Url,
        max_bytes: usize,
    ) -> Result<(ResponseInfo, LimitedBody), (FetchErrorKind, Option<ResponseInfo>)> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| (FetchErrorKind::Transport(describe_error(&e)), None))?;

        let info = ResponseInfo::from_response(&response);
        if !response.status().is_success() {
            let kind = FetchErrorKind::HttpStatus {
                code: info.status_code,
                status: info.status.clone(),
            };
            return Err((kind, Some(info)));
        }

        let body = read_limited(response.bytes_stream(), max_bytes)
            .await
            .map_err(|e| (FetchErrorKind::Read(describe_error(&e)), Some(info.clone())))?;

        Ok((info, body))
    }
}

#[async_trait]
impl ImageFetcher for BoundedFetcher {
    #[tracing::instrument(skip(self, cancel, url), fields(url = %url))]
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        url: &Url,
        max_bytes: usize,
    ) -> Result<FetchedImage, FetchError> {
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err((FetchErrorKind::Cancelled, None)),
            result = self.execute(url, max_bytes) => result,
        };

        let elapsed = round_to_millis(start.elapsed());

        match outcome {
            Ok((response, body)) => {
                tracing::debug!(
                    status = %response.status,
                    downloaded_bytes = body.data.len(),
                    truncated = body.truncated,
                    duration_ms = elapsed.as_millis() as u64,
                    "Fetched remote image"
                );
                Ok(FetchedImage {
                    data: body.data,
                    truncated: body.truncated,
                    response,
                    elapsed,
                })
            }
            Err((kind, response)) => {
                tracing::warn!(
                    error = %kind,
                    duration_ms = elapsed.as_millis() as u64,
                    "Remote fetch failed"
                );
                Err(FetchError {
                    kind,
                    response,
                    elapsed,
                })
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct LimitedBody {
    pub(crate) data: Bytes,
    pub(crate) truncated: bool,
}

/// Buffer at most `max_bytes + 1` bytes of `stream`, then cut back to `max_bytes`.
///
/// The extra byte is what tells a body of exactly `max_bytes` apart from a longer one.
/// Once the limit is reached the stream is not polled again.
pub(crate) async fn read_limited<S, E>(stream: S, max_bytes: usize) -> Result<LimitedBody, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let limit = max_bytes.saturating_add(1);
    let mut stream = std::pin::pin!(stream);
    let mut buffer = BytesMut::with_capacity(limit.min(64 * 1024));

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let remaining = limit - buffer.len();
        if chunk.len() >= remaining {
            buffer.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buffer.extend_from_slice(&chunk);
    }

    let truncated = buffer.len() > max_bytes;
    if truncated {
        buffer.truncate(max_bytes);
    }

    Ok(LimitedBody {
        data: buffer.freeze(),
        truncated,
    })
}

fn round_to_millis(elapsed: Duration) -> Duration {
    let micros = elapsed.as_micros();
    Duration::from_millis(((micros + 500) / 1000) as u64)
}

/// Compact duration text: `0s`, `850ms`, `1.25s`, `1m3.5s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = round_to_millis(elapsed).as_millis();
    if millis == 0 {
        return "0s".to_string();
    }
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let minutes = millis / 60_000;
    let rest = millis % 60_000;
    let seconds = format!("{}.{:03}", rest / 1000, rest % 1000);
    let seconds = seconds.trim_end_matches('0').trim_end_matches('.');

    if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

// reqwest's Display stops at the outermost layer; the cause is what users need.
fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    fn chunks(sizes: &[usize]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        let items: Vec<Result<Bytes, Infallible>> = sizes
            .iter()
            .map(|&n| Ok(Bytes::from(vec![0xAB; n])))
            .collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_read_limited_exact_ceiling_is_not_truncated() {
        let body = read_limited(chunks(&[10, 6]), 16).await.unwrap();
        assert_eq!(body.data.len(), 16);
        assert!(!body.truncated);
    }

    #[tokio::test]
    async fn test_read_limited_one_over_ceiling_is_truncated() {
        let body = read_limited(chunks(&[17]), 16).await.unwrap();
        assert_eq!(body.data.len(), 16);
        assert!(body.truncated);
    }

    #[tokio::test]
    async fn test_read_limited_stops_polling_after_limit() {
        let polled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = polled.clone();
        let endless = stream::repeat_with(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, Infallible>(Bytes::from_static(&[1u8; 4]))
        });

        let body = read_limited(endless, 10).await.unwrap();
        assert!(body.truncated);
        assert_eq!(body.data.len(), 10);
        assert_eq!(polled.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_limited_propagates_stream_error() {
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err("connection reset"),
        ]);
        let err = read_limited(failing, 100).await.unwrap_err();
        assert_eq!(err, "connection reset");
    }

    #[tokio::test]
    async fn test_read_limited_empty_body() {
        let body = read_limited(chunks(&[]), 16).await.unwrap();
        assert!(body.data.is_empty());
        assert!(!body.truncated);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_micros(400)), "0s");
        assert_eq!(format_elapsed(Duration::from_micros(1500)), "2ms");
        assert_eq!(format_elapsed(Duration::from_millis(850)), "850ms");
        assert_eq!(format_elapsed(Duration::from_millis(1000)), "1s");
        assert_eq!(format_elapsed(Duration::from_millis(1250)), "1.25s");
        assert_eq!(format_elapsed(Duration::from_millis(63_500)), "1m3.5s");
        assert_eq!(format_elapsed(Duration::from_secs(60)), "1m0s");
    }

    #[test]
    fn test_error_messages() {
        let kind = FetchErrorKind::HttpStatus {
            code: 404,
            status: "404 Not Found".to_string(),
        };
        assert_eq!(kind.to_string(), "HTTP 404: 404 Not Found");
        assert_eq!(
            FetchErrorKind::Cancelled.to_string(),
            "fetch error: request cancelled"
        );
        assert_eq!(
            FetchErrorKind::Read("eof".to_string()).to_string(),
            "read error: eof"
        );
    }

    async fn serve(server: &mut mockito::ServerGuard, path: &str, body: Vec<u8>) -> mockito::Mock {
        server
            .mock("GET", path)
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
            .with_body(body)
            .create_async()
            .await
    }

    fn fetcher() -> BoundedFetcher {
        BoundedFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_body_at_ceiling() {
        let mut server = mockito::Server::new_async().await;
        let mock = serve(&mut server, "/exact.png", vec![1u8; 32]).await;
        let url = Url::parse(&format!("{}/exact.png", server.url())).unwrap();

        let fetched = fetcher()
            .fetch(&CancellationToken::new(), &url, 32)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(fetched.data.len(), 32);
        assert!(!fetched.truncated);
        assert_eq!(fetched.response.status_code, 200);
        assert_eq!(fetched.response.status, "200 OK");
        assert_eq!(fetched.response.content_type.as_deref(), Some("image/png"));
        assert_eq!(fetched.response.content_length, Some(32));
        assert_eq!(
            fetched.response.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[tokio::test]
    async fn test_fetch_body_over_ceiling_is_truncated() {
        let mut server = mockito::Server::new_async().await;
        let _mock = serve(&mut server, "/big.png", vec![1u8; 33]).await;
        let url = Url::parse(&format!("{}/big.png", server.url())).unwrap();

        let fetched = fetcher()
            .fetch(&CancellationToken::new(), &url, 32)
            .await
            .unwrap();

        assert_eq!(fetched.data.len(), 32);
        assert!(fetched.truncated);
        assert_eq!(fetched.response.content_length, Some(33));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.png")
            .with_status(404)
            .with_body("nope")
            .create_async()
            .await;
        let url = Url::parse(&format!("{}/missing.png", server.url())).unwrap();

        let err = fetcher()
            .fetch(&CancellationToken::new(), &url, 1024)
            .await
            .unwrap_err();

        assert_eq!(
            err.kind,
            FetchErrorKind::HttpStatus {
                code: 404,
                status: "404 Not Found".to_string()
            }
        );
        assert_eq!(err.to_string(), "HTTP 404: 404 Not Found");
        let response = err.response.unwrap();
        assert_eq!(response.status_code, 404);
    }

    #[tokio::test]
    async fn test_fetch_transport_failure() {
        // Port 9 (discard) is closed on test hosts
        let url = Url::parse("http://127.0.0.1:9/a.png").unwrap();
        let err = fetcher()
            .fetch(&CancellationToken::new(), &url, 1024)
            .await
            .unwrap_err();

        assert!(matches!(err.kind, FetchErrorKind::Transport(_)));
        assert!(err.to_string().starts_with("fetch error: "));
        assert!(err.response.is_none());
    }

    #[tokio::test]
    async fn test_fetch_cancelled() {
        let mut server = mockito::Server::new_async().await;
        let _mock = serve(&mut server, "/slow.png", vec![1u8; 8]).await;
        let url = Url::parse(&format!("{}/slow.png", server.url())).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetcher().fetch(&cancel, &url, 1024).await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Cancelled);
        assert_eq!(err.to_string(), "fetch error: request cancelled");
    }
}
