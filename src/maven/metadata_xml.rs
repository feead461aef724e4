use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::maven::coordinates::ArtifactCoordinates;
use crate::maven::paths::SNAPSHOT_TIMESTAMP_FORMAT;

/// Format of <lastUpdated> and <updated>
pub const LAST_UPDATED_FORMAT: &str = "%Y%m%d%H%M%S";

/// Written verbatim, single-quoted like in the metadata files already published
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>\n";

/// The maven-metadata.xml describing all versions of an artifact, see
///  https://maven.apache.org/ref/3.9.5/maven-repository-metadata/repository-metadata.html
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReleaseMetadata {
    pub coordinates: ArtifactCoordinates,
    pub latest: String,
    /// empty if there are only snapshots
    pub release: String,
    pub versions: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub build_number: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SnapshotVersion {
    pub extension: String,
    pub value: String,
    pub updated: NaiveDateTime,
}

/// The maven-metadata.xml inside a snapshot version's folder, listing its timestamped builds
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SnapshotListingMetadata {
    pub coordinates: ArtifactCoordinates,
    /// including "-SNAPSHOT"
    pub version: String,
    pub snapshot: Snapshot,
    pub last_updated: DateTime<Utc>,
    pub snapshot_versions: Vec<SnapshotVersion>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MetadataDocument {
    Release(ReleaseMetadata),
    SnapshotListing(SnapshotListingMetadata),
}

impl MetadataDocument {
    /// Serializes the document without indentation, with explicit end tags for empty elements
    pub fn to_xml(&self) -> quick_xml::Result<Vec<u8>> {
        let mut w = MetadataWriter::new();

        w.start("metadata")?;
        match self {
            MetadataDocument::Release(m) => {
                w.coordinates(&m.coordinates)?;
                w.start("versioning")?;
                w.text_element("latest", &m.latest)?;
                w.text_element("release", &m.release)?;
                w.start("versions")?;
                for version in &m.versions {
                    w.text_element("version", version)?;
                }
                w.end("versions")?;
                w.text_element("lastUpdated", &m.last_updated.format(LAST_UPDATED_FORMAT).to_string())?;
                w.end("versioning")?;
            }
            MetadataDocument::SnapshotListing(m) => {
                w.coordinates(&m.coordinates)?;
                w.text_element("version", &m.version)?;
                w.start("versioning")?;
                w.start("snapshot")?;
                w.text_element("timestamp", &m.snapshot.timestamp.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string())?;
                w.text_element("buildNumber", &m.snapshot.build_number.to_string())?;
                w.end("snapshot")?;
                w.text_element("lastUpdated", &m.last_updated.format(LAST_UPDATED_FORMAT).to_string())?;
                w.start("snapshotVersions")?;
                for snapshot_version in &m.snapshot_versions {
                    w.start("snapshotVersion")?;
                    w.text_element("extension", &snapshot_version.extension)?;
                    w.text_element("value", &snapshot_version.value)?;
                    w.text_element("updated", &snapshot_version.updated.format(LAST_UPDATED_FORMAT).to_string())?;
                    w.end("snapshotVersion")?;
                }
                w.end("snapshotVersions")?;
                w.end("versioning")?;
            }
        }
        w.end("metadata")?;

        Ok(w.into_inner())
    }
}

struct MetadataWriter {
    writer: Writer<Vec<u8>>,
}
impl MetadataWriter {
    fn new() -> MetadataWriter {
        MetadataWriter {
            writer: Writer::new(XML_DECLARATION.as_bytes().to_vec()),
        }
    }

    fn start(&mut self, name: &str) -> quick_xml::Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> quick_xml::Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))
    }

    /// only '<', '>' and '&' are escaped in text content
    fn text_element(&mut self, name: &str, text: &str) -> quick_xml::Result<()> {
        self.start(name)?;
        self.writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        self.end(name)
    }

    fn coordinates(&mut self, coordinates: &ArtifactCoordinates) -> quick_xml::Result<()> {
        self.text_element("groupId", &coordinates.group_id.0)?;
        self.text_element("artifactId", &coordinates.artifact_id.0)
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}
