//! Time-to-live keyed byte store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use rand::RngCore;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::sweeper::spawn_sweeper;

pub(crate) type BlobTable = Arc<RwLock<HashMap<String, BlobEntry>>>;

pub(crate) struct BlobEntry {
    data: Bytes,
    content_type: String,
    expires_at: Instant,
}

impl BlobEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Bytes and content type handed back by [`TransientBlobStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

/// In-memory store whose entries expire after a fixed TTL.
///
/// Expired entries are removed lazily on `get` and eagerly by a background sweeper
/// started with the store. The sweeper stops on [`shutdown`](Self::shutdown) or when
/// the store is dropped.
pub struct TransientBlobStore {
    entries: BlobTable,
    ttl: Duration,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl TransientBlobStore {
    /// Create the store and start its sweeper. Must be called inside a Tokio runtime.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let entries: BlobTable = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        let sweeper = spawn_sweeper(entries.clone(), sweep_interval, shutdown.clone());

        tracing::debug!(
            ttl_secs = ttl.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "Transient blob store started"
        );

        Self {
            entries,
            ttl,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store bytes and return their opaque id.
    pub async fn put(&self, data: impl Into<Bytes>, content_type: impl Into<String>) -> String {
        let entry = BlobEntry {
            data: data.into(),
            content_type: content_type.into(),
            expires_at: Instant::now() + self.ttl,
        };
        let size = entry.data.len();

        let mut entries = self.entries.write().await;
        let mut id = generate_id();
        while entries.contains_key(&id) {
            id = generate_id();
        }
        entries.insert(id.clone(), entry);
        drop(entries);

        tracing::debug!(blob_id = %id, size, "Stored transient blob");
        id
    }

    /// Fetch an entry that has not expired yet. Expired entries are deleted.
    pub async fn get(&self, id: &str) -> Option<StoredBlob> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(id)?;
            if !entry.is_expired(Instant::now()) {
                return Some(StoredBlob {
                    data: entry.data.clone(),
                    content_type: entry.content_type.clone(),
                });
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(id)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(id);
            tracing::debug!(blob_id = %id, "Removed expired blob on read");
        }
        None
    }

    /// Delete every expired entry and return how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        remove_expired(&self.entries).await
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = match self.sweeper.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Blob sweeper exited abnormally");
            }
        }
    }
}

impl Drop for TransientBlobStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One scan under the write lock.
pub(crate) async fn remove_expired(entries: &RwLock<HashMap<String, BlobEntry>>) -> usize {
    let now = Instant::now();
    let mut entries = entries.write().await;
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before - entries.len()
}

fn generate_id() -> String {
    let mut raw = [0u8; 16];
    rand::rng().fill_bytes(&mut raw);
    hex::encode(raw)
}
