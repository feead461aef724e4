use thiserror::Error;

use crate::maven::pom::PomError;

/// Everything that aborts the generation of a maven-metadata.xml file. Cache invalidation
///  failures are not represented here, the handler logs and drops them.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not a valid Maven artifact path: {0:?}")]
    MalformedKey(String),

    #[error("{path:?} does not contain a valid version: {version:?}")]
    InvalidVersionFormat {
        path: String,
        version: String,
    },

    #[error("no .pom files found under {0:?}")]
    EmptyFolderListing(String),

    #[error("not a valid snapshot file name: {0:?}")]
    MalformedSnapshotFileName(String),

    #[error("could not read packaging from {key:?}: {source}")]
    InvalidPom {
        key: String,
        #[source]
        source: PomError,
    },

    #[error("artifact store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    #[error("could not serialize metadata: {0}")]
    Serialization(#[from] quick_xml::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;
