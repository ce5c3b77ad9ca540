//! Limits and defaults shared by the fetcher, the blob store and the API layer.

/// Remote fetch ceiling: 20 MiB.
pub const MAX_IMAGE_BYTES: usize = 20 << 20;

/// Upload acceptance ceiling: the image ceiling plus 1 MiB of multipart overhead.
pub const MAX_UPLOAD_BYTES: usize = MAX_IMAGE_BYTES + (1 << 20);

/// Absolute wall-clock budget for one remote fetch.
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// How long uploaded bytes stay replayable.
pub const BLOB_TTL_SECS: u64 = 60 * 60;

/// Interval between sweeps of expired blobs.
pub const BLOB_SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Maximum number of URLs accepted in one batch request.
pub const MAX_BATCH_URLS: usize = 20;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// User-Agent sent with every outbound fetch.
pub const USER_AGENT: &str = "metascope/2.0";

/// Path prefix of replay URLs handed out for stored uploads.
pub const BLOB_ROUTE_PREFIX: &str = "/blob/";

/// Fallback MIME type when an upload declares none and sniffing fails.
pub const OCTET_STREAM: &str = "application/octet-stream";
