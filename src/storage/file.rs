use std::{collections::HashMap, fs::File, path::PathBuf, time::SystemTime};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{create_dir_all, read_to_string, remove_file, write},
    task::spawn_blocking,
};
use uuid::Uuid;

use super::{Storage, StorageItem};

const APP_DIR: &str = "proxy_manager";

/// `proxy_manager` under the platform's local data folder.
fn default_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("no base dir for storage")?;
    Ok(base.join(APP_DIR))
}

/// Stores every value in its own file; `index.json` maps keys to file names.
pub struct FileStorage {
    prefix: String,
    dir: PathBuf,
    index_path: PathBuf,
}

impl FileStorage {
    pub async fn new(prefix: impl Into<String>) -> Result<Self> {
        Self::new_in(default_dir()?, prefix).await
    }

    pub async fn new_in(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        create_dir_all(&dir)
            .await
            .context("Failed to create storage dir")?;
        let index_path = dir.join("index.json");
        let storage = FileStorage {
            prefix: prefix.into(),
            dir,
            index_path: index_path.clone(),
        };
        if tokio::fs::metadata(index_path).await.is_err() {
            storage
                .set_index(Index {
                    version: 0,
                    index: HashMap::new(),
                })
                .await?;
        }

        Ok(storage)
    }
    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
    async fn get_index(&self) -> Result<Index> {
        let index_path = self.index_path.clone();
        let index = spawn_blocking(move || {
            let file = File::open(&index_path).context("open storage index")?;
            file.lock_shared().context("lock storage index")?;
            let result = serde_json::from_reader(&file).context("deserialize storage index");
            file.unlock().context("unlock storage index")?;
            Result::<Index>::Ok(result?)
        })
        .await??;
        Ok(index)
    }
    async fn set_index(&self, index: Index) -> Result<()> {
        let index_path = self.index_path.clone();
        spawn_blocking(move || {
            let file = File::create(&index_path).context("open storage index")?;
            file.lock_exclusive().context("lock storage index mut")?;
            let result = serde_json::to_writer(&file, &index).context("serialize storage index");
            file.unlock().context("unlock storage index")?;
            Result::<()>::Ok(result?)
        })
        .await??;
        Ok(())
    }
}

#[derive(Deserialize, Serialize)]
struct Index {
    version: u32,
    index: HashMap<String, StorageItem>,
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageItem>> {
        let index = self.get_index().await?;
        Ok(match index.index.get(&self.key(key)) {
            Some(item) => Some(StorageItem {
                updated_at: item.updated_at,
                content: read_to_string(self.dir.join(&item.content))
                    .await
                    .with_context(|| format!("read storage item {}", key))?,
            }),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = self.key(key);
        let mut index = self.get_index().await?;

        let filename = index
            .index
            .get(&key)
            .map(|item| item.content.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        write(self.dir.join(&filename), value).await?;

        index.index.insert(
            key,
            StorageItem {
                updated_at: SystemTime::now(),
                content: filename,
            },
        );
        self.set_index(index).await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut index = self.get_index().await?;
        if let Some(item) = index.index.remove(&self.key(key)) {
            self.set_index(index).await?;
            let path = self.dir.join(&item.content);
            if let Err(e) = remove_file(&path).await {
                tracing::warn!("Failed to remove storage file {:?}: {:?}", path, e);
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let index = self.get_index().await?;
        Ok(index
            .index
            .keys()
            .filter_map(|i| i.strip_prefix(&self.prefix))
            .map(ToString::to_string)
            .collect())
    }
}
