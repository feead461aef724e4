use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;

use crate::store::artifact_store::ArtifactStore;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub cache_control: Option<String>,
}

/// in-memory artifact store, neither optimized nor particularly robust - for testing purposes.
///
/// Every write is kept as a separate version, and listings are in lexicographic key order like
///  S3's.
pub struct TransientArtifactStore {
    data: Mutex<BTreeMap<(String, String), Vec<StoredObject>>>,
}
impl TransientArtifactStore {
    pub fn new() -> TransientArtifactStore {
        TransientArtifactStore {
            data: Default::default(),
        }
    }

    /// Convenience for setting up a bucket's content
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) -> anyhow::Result<()> {
        self.lock()?
            .entry((bucket.to_string(), key.to_string()))
            .or_default()
            .push(StoredObject {
                body: body.into(),
                content_type: "application/octet-stream".to_string(),
                cache_control: None,
            });
        Ok(())
    }

    /// The current version of an object
    pub fn stored(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.data.lock().ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|versions| versions.last().cloned())
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, BTreeMap<(String, String), Vec<StoredObject>>>> {
        self.data.lock()
            .map_err(|_| anyhow!("transient artifact store is poisoned"))
    }
}

impl Default for TransientArtifactStore {
    fn default() -> Self {
        TransientArtifactStore::new()
    }
}

#[async_trait]
impl ArtifactStore for TransientArtifactStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.lock()?
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes> {
        self.stored(bucket, key)
            .map(|o| o.body)
            .ok_or_else(|| anyhow!("no such key: {}/{}", bucket, key))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: Option<&str>,
    ) -> anyhow::Result<String> {
        self.lock()?
            .entry((bucket.to_string(), key.to_string()))
            .or_default()
            .push(StoredObject {
                body,
                content_type: content_type.to_string(),
                cache_control: cache_control.map(|s| s.to_string()),
            });
        Ok(key.to_string())
    }

    async fn count_versions(&self, bucket: &str, key: &str) -> anyhow::Result<Option<usize>> {
        Ok(self.lock()?
            .get(&(bucket.to_string(), key.to_string()))
            .map(|versions| versions.len()))
    }

    async fn copy_object(&self, source_bucket: &str, key: &str, target_bucket: &str) -> anyhow::Result<()> {
        let current = self.stored(source_bucket, key)
            .ok_or_else(|| anyhow!("no such key: {}/{}", source_bucket, key))?;

        self.lock()?
            .entry((target_bucket.to_string(), key.to_string()))
            .or_default()
            .push(current);
        Ok(())
    }
}
