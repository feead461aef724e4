use std::path::{Component, Path, PathBuf};

use anyhow::anyhow;
use async_recursion::async_recursion;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{copy, create_dir_all, read, read_dir, remove_file, rename, try_exists, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::store::artifact_store::ArtifactStore;

/// Artifact store backed by the local file system, for running the indexer against a plain
///  directory tree. Object `<key>` of bucket `<bucket>` is stored at `<root>/<bucket>/<key>`.
///
/// Content type and cache control are not persisted, and there is no version history: an existing
///  file counts as a single version.
pub struct FsArtifactStore {
    root: PathBuf,
}
impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> FsArtifactStore {
        FsArtifactStore {
            root: root.into(),
        }
    }

    fn bucket_path(&self, bucket: &str) -> anyhow::Result<PathBuf> {
        let mut result = self.root.clone();
        result.push(checked_relative_path(bucket)?);
        Ok(result)
    }

    fn object_path(&self, bucket: &str, key: &str) -> anyhow::Result<PathBuf> {
        let mut result = self.bucket_path(bucket)?;
        result.push(checked_relative_path(key)?);
        Ok(result)
    }

    #[async_recursion]
    async fn collect_keys(dir: &Path, key_prefix: &str, result: &mut Vec<String>) -> anyhow::Result<()> {
        let mut entries = read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_str()
                .ok_or_else(|| anyhow!("not a valid UTF-8 file name: {:?}", entry.path()))?;
            if name.ends_with(".inserting") {
                continue;
            }

            let key = format!("{}{}", key_prefix, name);
            if entry.file_type().await?.is_dir() {
                Self::collect_keys(&entry.path(), &format!("{}/", key), result).await?;
            }
            else {
                result.push(key);
            }
        }
        Ok(())
    }

    async fn write_then_rename(temp_path: &Path, path: &Path, body: &[u8]) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp_path)
            .await?;
        file.write_all(body).await?;
        file.flush().await?;
        drop(file);

        rename(temp_path, path).await?;
        Ok(())
    }
}

/// Rejects keys that would escape the store's root directory
fn checked_relative_path(key: &str) -> anyhow::Result<PathBuf> {
    let path = PathBuf::from(key.trim_start_matches('/'));
    let is_plain = path.components()
        .all(|c| matches!(c, Component::Normal(_)));

    if !is_plain || path.as_os_str().is_empty() {
        return Err(anyhow!("not a valid object key for a file system store: {:?}", key));
    }
    Ok(path)
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        let bucket_path = self.bucket_path(bucket)?;
        trace!("listing {:?} in directory {}", prefix, bucket_path.display());

        let mut keys = Vec::new();
        if try_exists(&bucket_path).await? {
            Self::collect_keys(&bucket_path, "", &mut keys).await?;
        }

        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes> {
        let path = self.object_path(bucket, key)?;
        trace!("reading {}", path.display());
        Ok(Bytes::from(read(&path).await?))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        _cache_control: Option<&str>,
    ) -> anyhow::Result<String> {
        let path = self.object_path(bucket, key)?;
        debug!("writing {} ({}, {} bytes)", path.display(), content_type, body.len());

        let parent = path.parent()
            .ok_or_else(|| anyhow!("object path without parent: {}", path.display()))?;
        create_dir_all(parent).await?;

        // write to a temporary file first so that readers never see partial content
        let mut temp_path = parent.to_path_buf();
        temp_path.push(format!("{}.inserting", Uuid::new_v4().as_hyphenated()));

        if let Err(e) = Self::write_then_rename(&temp_path, &path, &body).await {
            if let Err(remove_err) = remove_file(&temp_path).await {
                trace!("could not remove {}: {}", temp_path.display(), remove_err);
            }
            return Err(e);
        }
        Ok(key.to_string())
    }

    async fn count_versions(&self, bucket: &str, key: &str) -> anyhow::Result<Option<usize>> {
        let path = self.object_path(bucket, key)?;
        Ok(if try_exists(&path).await? { Some(1) } else { None })
    }

    async fn copy_object(&self, source_bucket: &str, key: &str, target_bucket: &str) -> anyhow::Result<()> {
        let source = self.object_path(source_bucket, key)?;
        let target = self.object_path(target_bucket, key)?;
        debug!("copying {} to {}", source.display(), target.display());

        if let Some(parent) = target.parent() {
            create_dir_all(parent).await?;
        }
        copy(&source, &target).await?;
        Ok(())
    }
}
