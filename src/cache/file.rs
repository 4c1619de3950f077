//! On-disk response cache, one JSON file per fingerprint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{CacheError, ResponseCache};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    fingerprint: String,
    response: String,
}

/// Responses stored under `root/<first two hex digits>/<fingerprint>.json`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        let shard = fingerprint.get(..2).unwrap_or(fingerprint);
        self.root.join(shard).join(format!("{fingerprint}.json"))
    }
}

#[async_trait]
impl ResponseCache for FileCache {
    async fn get(&self, fingerprint: &str) -> Option<String> {
        let path = self.entry_path(fingerprint);
        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<CachedResponse>(&bytes) {
                Ok(entry) => {
                    debug!(path = %path.display(), "Response cache hit");
                    Some(entry.response)
                }
                Err(err) => {
                    warn!(%err, path = %path.display(), "failed to parse cached response");
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(%err, path = %path.display(), "failed to read cached response");
                None
            }
        }
    }

    async fn set(&self, fingerprint: &str, response: &str) -> Result<(), CacheError> {
        let path = self.entry_path(fingerprint);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let entry = CachedResponse {
            fingerprint: fingerprint.to_string(),
            response: response.to_string(),
        };
        let payload = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&path, &payload).await?;
        debug!(path = %path.display(), "Response cache store");
        Ok(())
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp).await?;
    file.write_all(data).await?;
    file.flush().await?;
    fs::rename(tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "3f2a9c0d5e";

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();

        assert_eq!(cache.get(KEY).await, None);
        cache.set(KEY, "action: tap\nid: 3").await.unwrap();
        assert_eq!(cache.get(KEY).await.as_deref(), Some("action: tap\nid: 3"));

        let entry = dir.path().join("3f").join(format!("{KEY}.json"));
        assert!(entry.exists());
        assert!(!entry.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FileCache::new(dir.path())
            .unwrap()
            .set(KEY, "action: home")
            .await
            .unwrap();

        let reopened = FileCache::new(dir.path()).unwrap();
        assert_eq!(reopened.get(KEY).await.as_deref(), Some("action: home"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();
        let shard = dir.path().join("3f");
        std::fs::create_dir_all(&shard).unwrap();
        std::fs::write(shard.join(format!("{KEY}.json")), b"{ not json").unwrap();

        assert_eq!(cache.get(KEY).await, None);
    }

    #[tokio::test]
    async fn test_set_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache")).unwrap();
        std::fs::remove_dir_all(cache.root()).unwrap();
        std::fs::write(cache.root(), b"occupied").unwrap();

        assert!(cache.set(KEY, "action: done").await.is_err());
    }
}
