use std::{collections::BTreeMap, time::SystemTime};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Storage, StorageItem};

/// Storage that forgets everything on exit. Used by tests and `--ephemeral`.
#[derive(Default)]
pub struct MemoryCache {
    items: RwLock<BTreeMap<String, StorageItem>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }
}

#[async_trait]
impl Storage for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<StorageItem>> {
        Ok(self.items.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let item = StorageItem {
            updated_at: SystemTime::now(),
            content: value.to_string(),
        };
        self.items.write().insert(key.to_string(), item);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    /// Sorted.
    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}
