//! In-process response cache.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{CacheError, ResponseCache};

/// A mutex-guarded map; entries live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // Each insert is a single map operation, so a poisoned map is still whole.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, fingerprint: &str) -> Option<String> {
        self.lock().get(fingerprint).cloned()
    }

    async fn set(&self, fingerprint: &str, response: &str) -> Result<(), CacheError> {
        self.lock()
            .insert(fingerprint.to_string(), response.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("abc").await, None);

        cache.set("abc", "action: home").await.unwrap();
        assert_eq!(cache.get("abc").await.as_deref(), Some("action: home"));

        cache.set("abc", "action: done").await.unwrap();
        assert_eq!(cache.get("abc").await.as_deref(), Some("action: done"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_survives_poisoned_lock() {
        let cache = std::sync::Arc::new(MemoryCache::new());
        cache.set("abc", "action: home").await.unwrap();

        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the cache lock");
        })
        .join();
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.get("abc").await.as_deref(), Some("action: home"));
        cache.set("def", "action: done").await.unwrap();
        assert_eq!(cache.get("def").await.as_deref(), Some("action: done"));
        assert_eq!(cache.len(), 2);
    }
}
