use std::sync::Arc;

use tracing::{info, warn};

use crate::store::artifact_store::ArtifactStore;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CopyOutcome {
    Copied,
    /// the source object is unknown
    NotFound,
    /// the key was written before, so copying would overwrite a published artifact
    Conflict,
}

impl CopyOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            CopyOutcome::Copied => 200,
            CopyOutcome::NotFound => 404,
            CopyOutcome::Conflict => 409,
        }
    }
}

/// Promotes newly written objects to a target bucket, refusing to overwrite keys that have
///  more than one version in the source bucket.
pub struct CopyHandler {
    store: Arc<dyn ArtifactStore>,
    target_bucket: String,
}

impl CopyHandler {
    pub fn new(store: Arc<dyn ArtifactStore>, target_bucket: String) -> CopyHandler {
        CopyHandler {
            store,
            target_bucket,
        }
    }

    pub async fn handle(&self, bucket: &str, key: &str) -> anyhow::Result<CopyOutcome> {
        let outcome = match self.store.count_versions(bucket, key).await? {
            None => {
                warn!("{}/{} does not exist, not copying", bucket, key);
                CopyOutcome::NotFound
            }
            Some(n) if n > 1 => {
                warn!("{}/{} has {} versions, refusing to overwrite it in {}", bucket, key, n, self.target_bucket);
                CopyOutcome::Conflict
            }
            Some(_) => {
                self.store.copy_object(bucket, key, &self.target_bucket).await?;
                info!("copied {}/{} to {}", bucket, key, self.target_bucket);
                CopyOutcome::Copied
            }
        };
        Ok(outcome)
    }
}
