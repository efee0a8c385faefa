//! Explicitly-scoped key/blob persistence.
//!
//! The tool clients cache small things between sessions (an uploaded
//! spreadsheet's metadata, edited prompt templates). Instead of ambient
//! global storage, every consumer receives a [`BlobStore`] so the
//! pipeline and reducer logic stays testable in isolation.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Minimal key -> blob persistence seam.
///
/// Keys are flat strings; values are opaque byte blobs (callers decide
/// the encoding, typically JSON).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove the blob under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
