use async_trait::async_trait;
use tracing::info;

/// A CDN in front of the artifact store, whose cached copies of rewritten files must be dropped.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// `paths` are absolute (starting with '/'). `caller_reference` is unique per request, which
    ///  makes retried requests idempotent on the CDN's side.
    async fn invalidate(&self, distribution_id: &str, paths: &[String], caller_reference: &str) -> anyhow::Result<()>;
}

/// For deployments without a CDN endpoint: logs what would have been invalidated
pub struct NopCacheInvalidator {}

#[async_trait]
impl CacheInvalidator for NopCacheInvalidator {
    async fn invalidate(&self, distribution_id: &str, paths: &[String], _caller_reference: &str) -> anyhow::Result<()> {
        info!("no invalidation endpoint configured, not invalidating {} paths of distribution {}: {:?}", paths.len(), distribution_id, paths);
        Ok(())
    }
}

/// Makes a key usable as a CDN path
pub fn absolute_path(key: &str) -> String {
    if key.starts_with('/') {
        key.to_string()
    }
    else {
        format!("/{}", key)
    }
}
