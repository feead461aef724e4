use anyhow::anyhow;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, info};

use crate::store::artifact_store::ArtifactStore;

/// characters that stay unencoded in an S3 copy source
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Artifact store on AWS S3 (or an S3 compatible service). Credentials are resolved through the
///  standard AWS credential chain.
pub struct S3ArtifactStore {
    client: Client,
}

impl S3ArtifactStore {
    pub async fn new(
        region: Option<String>,
        endpoint_url: Option<String>,
        force_path_style: bool,
    ) -> anyhow::Result<S3ArtifactStore> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            config_loader = config_loader.region(aws_config::Region::new(region));
        }
        if let Some(endpoint) = &endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint);
        }
        let sdk_config = config_loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(force_path_style)
            .build();

        info!("S3 artifact store initialized (endpoint: {:?})", endpoint_url);
        Ok(S3ArtifactStore {
            client: Client::from_conf(s3_config),
        })
    }

    fn sdk_error(operation: &str, bucket: &str, key: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow!("S3 {} failed for {}/{}: {}", operation, bucket, key, err)
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        debug!("S3 list_objects_v2: bucket={} prefix={}", bucket, prefix);

        let mut pages = self.client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Self::sdk_error("list_objects_v2", bucket, prefix, e))?;
            keys.extend(page.contents()
                .iter()
                .filter_map(|o| o.key())
                .map(|k| k.to_string()));
        }
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes> {
        debug!("S3 get_object: bucket={} key={}", bucket, key);

        let response = self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::sdk_error("get_object", bucket, key, e))?;

        let body = response.body
            .collect()
            .await
            .map_err(|e| Self::sdk_error("get_object body", bucket, key, e))?;
        Ok(body.into_bytes())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: Option<&str>,
    ) -> anyhow::Result<String> {
        debug!("S3 put_object: bucket={} key={} content_type={}", bucket, key, content_type);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .set_cache_control(cache_control.map(|s| s.to_string()))
            .send()
            .await
            .map_err(|e| Self::sdk_error("put_object", bucket, key, e))?;

        Ok(key.to_string())
    }

    async fn count_versions(&self, bucket: &str, key: &str) -> anyhow::Result<Option<usize>> {
        debug!("S3 list_object_versions: bucket={} key={}", bucket, key);

        let response = self.client
            .list_object_versions()
            .bucket(bucket)
            .prefix(key)
            .send()
            .await
            .map_err(|e| Self::sdk_error("list_object_versions", bucket, key, e))?;

        // no <Version> elements at all means that nothing matches the prefix
        match &response.versions {
            None => Ok(None),
            Some(versions) => Ok(Some(versions.iter()
                .filter(|v| v.key() == Some(key))
                .count())),
        }
    }

    async fn copy_object(&self, source_bucket: &str, key: &str, target_bucket: &str) -> anyhow::Result<()> {
        let copy_source = format!("{}/{}", source_bucket, utf8_percent_encode(key, COPY_SOURCE));
        debug!("S3 copy_object: {} -> {}/{}", copy_source, target_bucket, key);

        self.client
            .copy_object()
            .bucket(target_bucket)
            .key(key)
            .copy_source(copy_source)
            .send()
            .await
            .map_err(|e| Self::sdk_error("copy_object", target_bucket, key, e))?;
        Ok(())
    }
}
