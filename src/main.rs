use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use maven_indexer::cdn::cache_invalidator::{CacheInvalidator, NopCacheInvalidator};
use maven_indexer::cdn::http_cache_invalidator::HttpCacheInvalidator;
use maven_indexer::config::{load_config, Config, StorageBackend};
use maven_indexer::copy::CopyHandler;
use maven_indexer::handler::MetadataHandler;
use maven_indexer::server::{app, AppState};
use maven_indexer::store::artifact_store::ArtifactStore;
use maven_indexer::store::fs_artifact_store::FsArtifactStore;
use maven_indexer::store::s3_artifact_store::S3ArtifactStore;
use maven_indexer::util::clock::SystemClock;

async fn artifact_store(config: &Config) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    let store: Arc<dyn ArtifactStore> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(S3ArtifactStore::new(
            config.storage.region.clone(),
            config.storage.endpoint_url.clone(),
            config.storage.force_path_style,
        ).await?),
        StorageBackend::Filesystem => {
            info!("using filesystem artifact store at {:?}", config.storage.root);
            Arc::new(FsArtifactStore::new(config.storage.root.clone()))
        }
    };
    Ok(store)
}

fn cache_invalidator(config: &Config) -> anyhow::Result<Arc<dyn CacheInvalidator>> {
    let invalidator: Arc<dyn CacheInvalidator> = match &config.cdn.invalidation_endpoint {
        Some(endpoint) => Arc::new(HttpCacheInvalidator::new(endpoint.clone())?),
        None => Arc::new(NopCacheInvalidator {}),
    };
    Ok(invalidator)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    info!("starting with {:?}", config);

    let store = artifact_store(&config).await?;
    let metadata_handler = MetadataHandler::new(
        store.clone(),
        cache_invalidator(&config)?,
        config.cdn.distribution_id.clone(),
        config.metadata.cache_control.clone(),
        Arc::new(SystemClock {}),
    );
    let copy_handler = config.copy.target_bucket.clone()
        .map(|target_bucket| Arc::new(CopyHandler::new(store.clone(), target_bucket)));

    let app = app(AppState {
        metadata_handler: Arc::new(metadata_handler),
        copy_handler,
    });

    let addr = SocketAddr::from_str(&config.server.bind)
        .with_context(|| format!("invalid bind address {:?}", config.server.bind))?;
    info!("serving {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
