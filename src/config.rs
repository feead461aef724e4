//! Service configuration: an optional JSON file, overridden by environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::handler::DEFAULT_CACHE_CONTROL;

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_VAR: &str = "MAVEN_INDEXER_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub cdn: CdnConfig,
    #[serde(default)]
    pub copy: CopyConfig,
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct ServerConfig {
    /// host:port
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Filesystem,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s3" => Ok(StorageBackend::S3),
            "filesystem" => Ok(StorageBackend::Filesystem),
            _ => Err(anyhow!("unknown storage backend {:?}, expected 's3' or 'filesystem'", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Root directory of the filesystem backend
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// S3 only. Falls back to the AWS SDK's region resolution
    #[serde(default)]
    pub region: Option<String>,

    /// S3 only, for S3 compatible services
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_storage_root(),
            region: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct MetadataConfig {
    /// Cache-Control header of every uploaded metadata and checksum file
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            cache_control: default_cache_control(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
pub struct CdnConfig {
    /// No cache invalidation without it
    #[serde(default)]
    pub distribution_id: Option<String>,

    /// Base URI of the invalidation API. Invalidations are only logged without it
    #[serde(default)]
    pub invalidation_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
pub struct CopyConfig {
    /// Copying is disabled without it
    #[serde(default)]
    pub target_bucket: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::S3
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_cache_control() -> String {
    DEFAULT_CACHE_CONTROL.to_string()
}

impl Config {
    /// Overrides settings with those environment variables that are set. `lookup` is
    ///  `std::env::var` outside of tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(bind) = lookup("MAVEN_INDEXER_BIND") {
            self.server.bind = bind;
        }
        if let Some(backend) = lookup("MAVEN_INDEXER_STORAGE") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(id) = lookup("CLOUDFRONT_DISTRIBUTION_ID") {
            self.cdn.distribution_id = Some(id);
        }
        if let Some(endpoint) = lookup("MAVEN_INDEXER_INVALIDATION_ENDPOINT") {
            self.cdn.invalidation_endpoint = Some(endpoint);
        }
        if let Some(bucket) = lookup("TARGET_BUCKET") {
            self.copy.target_bucket = Some(bucket);
        }
        Ok(())
    }
}

/// Parses a JSON config file. A missing file means defaults for everything.
pub fn load_config_file(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {:?}", path))?;
    let config = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config file {:?}", path))?;
    Ok(config)
}

/// The file named by `MAVEN_INDEXER_CONFIG` (if any), with environment overrides applied
pub fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => load_config_file(Path::new(&path))?,
        Err(_) => Config::default(),
    };
    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    Ok(config)
}
