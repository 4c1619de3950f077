//! Response cache keyed by request fingerprint.
//!
//! Caching is an optimization only: a miss or a failed write never changes
//! what the agent does, it only costs another model call.

mod file;
mod memory;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::ChatRequest;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Cache storage errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Store of previously observed model responses.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a response; unreadable entries count as misses.
    async fn get(&self, fingerprint: &str) -> Option<String>;

    /// Record the response for a fingerprint, replacing any previous one.
    async fn set(&self, fingerprint: &str, response: &str) -> Result<(), CacheError>;
}

/// Lowercase hex SHA-256 of the JSON-serialized request.
pub fn fingerprint(request: &ChatRequest) -> String {
    // Serializing plain strings and numbers cannot fail.
    let payload = serde_json::to_vec(request).unwrap_or_default();
    let digest = Sha256::digest(&payload);
    hex::encode(digest)
}
