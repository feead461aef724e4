use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cdn::cache_invalidator::{absolute_path, CacheInvalidator};
use crate::error::{MetadataError, MetadataResult};
use crate::event::ObjectRef;
use crate::maven::maven_repo_metadata::{generate_release_metadata, generate_snapshot_listing_metadata};
use crate::maven::metadata_xml::MetadataDocument;
use crate::maven::paths;
use crate::store::artifact_store::ArtifactStore;
use crate::util::checksum::ChecksumPair;
use crate::util::clock::Clock;

pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";
pub const DEFAULT_CACHE_CONTROL: &str = "max-age=600";

const XML_CONTENT_TYPE: &str = "text/xml";
const CHECKSUM_CONTENT_TYPE: &str = "text/plain";

/// Regenerates the maven-metadata.xml files affected by a newly stored object: the one in the
///  artifact folder, and for snapshots the one in the version folder.
///
/// Steps run strictly in sequence. Any failure aborts the invocation without rolling back
///  uploads that were already done, except for cache invalidation which is best effort.
pub struct MetadataHandler {
    store: Arc<dyn ArtifactStore>,
    invalidator: Arc<dyn CacheInvalidator>,
    distribution_id: Option<String>,
    cache_control: String,
    clock: Arc<dyn Clock>,
}

impl MetadataHandler {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        invalidator: Arc<dyn CacheInvalidator>,
        distribution_id: Option<String>,
        cache_control: String,
        clock: Arc<dyn Clock>,
    ) -> MetadataHandler {
        MetadataHandler {
            store,
            invalidator,
            distribution_id,
            cache_control,
            clock,
        }
    }

    /// Handles the objects of one notification in order, stopping at the first failure. Returns
    ///  the keys of all uploaded files.
    pub async fn handle_all(&self, objects: &[ObjectRef]) -> MetadataResult<Vec<String>> {
        let mut uploaded = Vec::new();
        for object in objects {
            uploaded.extend(self.handle(&object.bucket, &object.key).await?);
        }
        Ok(uploaded)
    }

    pub async fn handle(&self, bucket: &str, key: &str) -> MetadataResult<Vec<String>> {
        let result = self.do_handle(bucket, key).await;
        if let Err(e) = &result {
            error!("failed to update metadata for {}/{}: {}", bucket, key, e);
        }
        result
    }

    async fn do_handle(&self, bucket: &str, key: &str) -> MetadataResult<Vec<String>> {
        info!("updating metadata for {}/{}", bucket, key);
        let artifact_folder = paths::artifact_folder(key)?;
        let now = self.clock.now();

        let pom_keys = self.list_pom_keys(bucket, &artifact_folder).await?;
        let release_metadata = generate_release_metadata(&pom_keys, now)?;
        info!("{}: latest {:?}, release {:?}, {} versions", release_metadata.coordinates, release_metadata.latest, release_metadata.release, release_metadata.versions.len());

        let mut uploaded = self.upload_metadata(bucket, &artifact_folder, &MetadataDocument::Release(release_metadata)).await?;

        if paths::is_snapshot(key) {
            let version_folder = paths::version_folder(key)?;
            let snapshot_pom_keys = self.list_pom_keys(bucket, &version_folder).await?;
            let listing = generate_snapshot_listing_metadata(self.store.as_ref(), bucket, &snapshot_pom_keys, now).await?;
            info!("{} {}: {} snapshot builds", listing.coordinates, listing.version, listing.snapshot_versions.len());

            uploaded.extend(self.upload_metadata(bucket, &version_folder, &MetadataDocument::SnapshotListing(listing)).await?);
        }

        self.invalidate(&uploaded).await;
        Ok(uploaded)
    }

    async fn list_pom_keys(&self, bucket: &str, folder: &str) -> MetadataResult<Vec<String>> {
        let pom_keys: Vec<String> = self.store.list_keys(bucket, folder)
            .await
            .map_err(MetadataError::StoreUnavailable)?
            .into_iter()
            .filter(|k| paths::is_pom(k))
            .collect();

        if pom_keys.is_empty() {
            return Err(MetadataError::EmptyFolderListing(folder.to_string()));
        }
        Ok(pom_keys)
    }

    /// uploads the document followed by its .md5 and .sha1 files
    async fn upload_metadata(&self, bucket: &str, folder: &str, document: &MetadataDocument) -> MetadataResult<Vec<String>> {
        let xml = document.to_xml()?;
        let checksums = ChecksumPair::of(&xml);

        let mut uploaded = Vec::with_capacity(3);
        uploaded.push(self.upload(bucket, &paths::file_key(folder, METADATA_FILE_NAME), Bytes::from(xml), XML_CONTENT_TYPE).await?);

        for (extension, checksum) in checksums.files() {
            let key = paths::file_key(folder, &format!("{}.{}", METADATA_FILE_NAME, extension));
            uploaded.push(self.upload(bucket, &key, Bytes::from(checksum.to_string()), CHECKSUM_CONTENT_TYPE).await?);
        }
        Ok(uploaded)
    }

    async fn upload(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> MetadataResult<String> {
        info!("uploading {}/{}", bucket, key);
        self.store.put_object(bucket, key, body, content_type, Some(self.cache_control.as_str()))
            .await
            .map_err(MetadataError::StoreUnavailable)
    }

    async fn invalidate(&self, keys: &[String]) {
        let distribution_id = match &self.distribution_id {
            Some(id) => id,
            None => {
                info!("no CDN distribution configured, skipping cache invalidation");
                return;
            }
        };

        let paths: Vec<String> = keys.iter()
            .map(|k| absolute_path(k))
            .collect();
        let caller_reference = Uuid::new_v4().to_string();

        info!("invalidating {:?} in distribution {}", paths, distribution_id);
        if let Err(e) = self.invalidator.invalidate(distribution_id, &paths, &caller_reference).await {
            warn!("cache invalidation failed for distribution {}: {:#}", distribution_id, e);
        }
    }
}
