//! Metascope Storage Library
//!
//! This crate provides the in-memory transient blob store that lets uploaded bytes
//! be replayed by an opaque id for a limited time.
//!
//! # Blob ids
//!
//! Ids are 128 bits from the thread-local CSPRNG, hex encoded (32 characters). They
//! carry no information about the content and cannot be enumerated.

mod sweeper;
pub mod transient;

// Re-export commonly used types
pub use transient::{StoredBlob, TransientBlobStore};
