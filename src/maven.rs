pub mod coordinates;
pub mod maven_repo_metadata;
pub mod metadata_xml;
pub mod paths;
pub mod pom;
pub mod version;
