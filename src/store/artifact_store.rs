use async_trait::async_trait;
use bytes::Bytes;

/// The object storage holding a Maven repository. Keys are relative to the bucket and use '/' as
///  separator.
///
/// Implementations are expected to be created once and shared between invocations.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// All keys in the bucket starting with `prefix`, in the storage's listing order
    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>>;

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes>;

    /// Writes (or overwrites) an object, returning the key that was written
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: Option<&str>,
    ) -> anyhow::Result<String>;

    /// The number of stored versions of exactly this key, `None` if the key is unknown
    async fn count_versions(&self, bucket: &str, key: &str) -> anyhow::Result<Option<usize>>;

    /// Copies the current version of `key` to the same key in `target_bucket`
    async fn copy_object(&self, source_bucket: &str, key: &str, target_bucket: &str) -> anyhow::Result<()>;
}
