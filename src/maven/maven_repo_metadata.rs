use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::maven::metadata_xml::{ReleaseMetadata, Snapshot, SnapshotListingMetadata, SnapshotVersion};
use crate::maven::paths;
use crate::maven::paths::SNAPSHOT_TIMESTAMP_FORMAT;
use crate::maven::pom;
use crate::maven::version::MavenVersion;
use crate::store::artifact_store::ArtifactStore;

/// (key, version folder name) of every distinct .pom key, in listing order
pub fn versions_by_key(keys: &[String]) -> MetadataResult<Vec<(String, String)>> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for key in keys.iter().filter(|k| paths::is_pom(k)) {
        if seen.insert(key.as_str()) {
            result.push((key.clone(), paths::version(key)?));
        }
    }
    Ok(result)
}

fn parse_versions(versions_by_key: &[(String, String)]) -> MetadataResult<Vec<MavenVersion>> {
    versions_by_key.iter()
        .map(|(key, version)| version.parse::<MavenVersion>()
            .map_err(|_| MetadataError::InvalidVersionFormat {
                path: key.clone(),
                version: version.clone(),
            }))
        .collect()
}

/// The first of the highest versions, or None if there is nothing left after filtering
fn max_version(versions: &[MavenVersion], exclude_snapshots: bool) -> Option<&MavenVersion> {
    versions.iter()
        .filter(|v| !(exclude_snapshots && v.is_snapshot()))
        .reduce(|x, y| if x >= y { x } else { y })
}

/// Fails on the first version that can not be parsed, naming the key it was taken from
pub fn latest_version(versions_by_key: &[(String, String)], exclude_snapshots: bool) -> MetadataResult<Option<MavenVersion>> {
    let versions = parse_versions(versions_by_key)?;
    Ok(max_version(&versions, exclude_snapshots).cloned())
}

/// Distinct version strings in ascending version order
fn sorted_versions(versions: &[MavenVersion]) -> Vec<String> {
    let mut distinct: Vec<&MavenVersion> = Vec::new();
    let mut seen = HashSet::new();
    for version in versions {
        if seen.insert(version.as_str()) {
            distinct.push(version);
        }
    }

    distinct.sort_by(|a, b| a.cmp(b).then_with(|| a.as_str().cmp(b.as_str())));
    distinct.into_iter()
        .map(|v| v.to_string())
        .collect()
}

/// Builds the metadata for an artifact folder from the keys listed in it. Keys not ending in
///  '.pom' are ignored, and the artifact's coordinates are taken from the first .pom key.
pub fn generate_release_metadata(keys: &[String], last_updated: DateTime<Utc>) -> MetadataResult<ReleaseMetadata> {
    let versions_by_key = versions_by_key(keys)?;
    let (first_key, _) = versions_by_key.first()
        .ok_or_else(|| MetadataError::EmptyFolderListing(String::new()))?;
    let coordinates = paths::coordinates(first_key)?;

    let versions = parse_versions(&versions_by_key)?;
    let latest = max_version(&versions, false)
        .map(|v| v.to_string())
        .unwrap_or_default();
    let release = max_version(&versions, true)
        .map(|v| v.to_string())
        .unwrap_or_default();

    debug!("{}: latest {:?}, release {:?}", coordinates, latest, release);

    Ok(ReleaseMetadata {
        coordinates,
        latest,
        release,
        versions: sorted_versions(&versions),
        last_updated,
    })
}

/// One timestamped build of a snapshot version
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SnapshotBuild {
    /// without "-SNAPSHOT"
    pub version: String,
    pub timestamp: NaiveDateTime,
    pub build_number: u32,
    pub extension: String,
}

impl SnapshotBuild {
    /// e.g. "0.30.0-20181029.154529-1"
    pub fn value(&self) -> String {
        format!("{}-{}-{}", self.version, self.timestamp.format(SNAPSHOT_TIMESTAMP_FORMAT), self.build_number)
    }
}

async fn snapshot_build(store: &dyn ArtifactStore, bucket: &str, key: &str) -> MetadataResult<SnapshotBuild> {
    let file_name = paths::parse_snapshot_file_name(key)?;

    let pom = store.get_object(bucket, key)
        .await
        .map_err(MetadataError::StoreUnavailable)?;
    let extension = pom::extension(&pom)
        .map_err(|source| MetadataError::InvalidPom { key: key.to_string(), source })?;

    Ok(SnapshotBuild {
        version: file_name.base_version,
        timestamp: file_name.timestamp,
        build_number: file_name.build_number,
        extension,
    })
}

/// Builds the metadata for a snapshot version folder. All keys must be in the same version
///  folder; keys not ending in '.pom' are ignored.
///
/// Every POM is fetched to read its packaging, and any failure doing so fails the whole listing.
pub async fn generate_snapshot_listing_metadata(
    store: &dyn ArtifactStore,
    bucket: &str,
    keys: &[String],
    last_updated: DateTime<Utc>,
) -> MetadataResult<SnapshotListingMetadata> {
    let pom_keys: Vec<&String> = keys.iter()
        .filter(|k| paths::is_pom(k))
        .collect();
    let first_key = pom_keys.first()
        .ok_or_else(|| MetadataError::EmptyFolderListing(String::new()))?;
    let coordinates = paths::coordinates(first_key)?;
    let version = paths::version(first_key)?;

    let mut builds = Vec::with_capacity(pom_keys.len());
    for key in &pom_keys {
        builds.push(snapshot_build(store, bucket, key).await?);
    }

    // newest first
    builds.sort_by(|a, b| (b.timestamp, b.build_number).cmp(&(a.timestamp, a.build_number)));

    let latest = &builds[0];
    debug!("{} {}: latest snapshot build {}", coordinates, version, latest.value());

    Ok(SnapshotListingMetadata {
        coordinates,
        version,
        snapshot: Snapshot {
            timestamp: latest.timestamp,
            build_number: latest.build_number,
        },
        last_updated,
        snapshot_versions: builds.iter()
            .map(|b| SnapshotVersion {
                extension: b.extension.clone(),
                value: b.value(),
                updated: b.timestamp,
            })
            .collect(),
    })
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use chrono::TimeZone;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use rstest::*;

    use super::*;
    use crate::maven::metadata_xml::MetadataDocument;
    use crate::store::transient_artifact_store::TransientArtifactStore;
    use crate::util::checksum::ChecksumPair;

    const GECKOVIEW_FOLDER: &str = "maven2/org/mozilla/geckoview/geckoview-nightly-x86/";

    fn geckoview_pom(version: &str) -> String {
        format!("{}{}/geckoview-nightly-x86-{}.pom", GECKOVIEW_FOLDER, version, version)
    }

    fn geckoview_listing() -> Vec<String> {
        [
            "63.0.20180830111743",
            "64.0.20181018103737",
            "63.0.20180830111743",
            "65.0.20181028102554",
            "63.0.20180830100125",
            "65.0.20181029100346",
            "64.0.20181019100100",
        ].iter()
            .map(|v| geckoview_pom(v))
            .collect()
    }

    fn frozen_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 10, 29, 16, 0, 30).unwrap()
    }

    fn keyed(versions: &[&str]) -> Vec<(String, String)> {
        versions.iter()
            .enumerate()
            .map(|(i, v)| (format!("some/path/{}", i), v.to_string()))
            .collect()
    }

    /// the text of all <version> elements below <versions>
    fn parse_versions_element(xml: &[u8]) -> Vec<String> {
        let mut reader = Reader::from_reader(xml);
        let mut path: Vec<String> = Vec::new();
        let mut result = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => path.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap()),
                Event::End(_) => { path.pop(); }
                Event::Text(t) if path.ends_with(&["versions".to_string(), "version".to_string()]) => {
                    result.push(t.unescape().unwrap().to_string());
                }
                Event::Eof => break,
                _ => {}
            }
        }
        result
    }

    #[test]
    fn test_versions_by_key() {
        let mut keys = geckoview_listing();
        keys.push(format!("{}65.0.20181029100346/geckoview-nightly-x86-65.0.20181029100346.jar", GECKOVIEW_FOLDER));
        keys.push(format!("{}65.0.20181029100346/geckoview-nightly-x86-65.0.20181029100346.pom.sha1", GECKOVIEW_FOLDER));

        let versions = versions_by_key(&keys).unwrap();
        let versions: Vec<&str> = versions.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(versions, vec![
            "63.0.20180830111743",
            "64.0.20181018103737",
            "65.0.20181028102554",
            "63.0.20180830100125",
            "65.0.20181029100346",
            "64.0.20181019100100",
        ]);
    }

    #[rstest]
    #[case::nightlies(&["64.0.20181018103737", "63.0.20180830111743", "65.0.20181028102554", "63.0.20180830100125", "65.0.20181029100346", "64.0.20181019100100"], false, Some("65.0.20181029100346"))]
    #[case::single(&["64.0"], false, Some("64.0"))]
    #[case::two(&["64.0", "65.0"], false, Some("65.0"))]
    #[case::numeric_not_lexical(&["1.10", "1.9"], false, Some("1.10"))]
    #[case::snapshot_is_latest(&["1.0", "1.1-SNAPSHOT"], false, Some("1.1-SNAPSHOT"))]
    #[case::snapshot_excluded(&["1.0", "1.1-SNAPSHOT"], true, Some("1.0"))]
    #[case::release_above_its_snapshot(&["1.0-SNAPSHOT", "1.0"], false, Some("1.0"))]
    #[case::only_snapshots_excluded(&["1.0-SNAPSHOT"], true, None)]
    #[case::empty(&[], false, None)]
    #[case::first_of_equal(&["1.0", "1.0.0"], false, Some("1.0"))]
    #[case::first_of_equal_reversed(&["1.0.0", "1.0"], false, Some("1.0.0"))]
    fn test_latest_version(#[case] versions: &[&str], #[case] exclude_snapshots: bool, #[case] expected: Option<&str>) {
        let actual = latest_version(&keyed(versions), exclude_snapshots).unwrap();
        assert_eq!(actual.as_ref().map(|v| v.as_str()), expected);
    }

    #[test]
    fn test_latest_version_error() {
        let key = "maven2/org/mozilla/geckoview/geckoview-nightly-x86/64.0-TESTING/geckoview-nightly-x86-64.0-TESTING.pom";
        let versions_by_key = vec![
            ("some/path".to_string(), "64.0".to_string()),
            (key.to_string(), "64.0-TESTING".to_string()),
        ];

        let error = latest_version(&versions_by_key, false).unwrap_err();
        assert!(matches!(&error, MetadataError::InvalidVersionFormat { path, version } if path == key && version == "64.0-TESTING"));
        assert!(error.to_string().contains(&format!("{:?} does not contain a valid version", key)));
    }

    #[test]
    fn test_sorted_versions() {
        let versions = parse_versions(&keyed(&["1.10", "1.0.0", "1.9", "1.0-SNAPSHOT", "1.0", "1.9", "2.0"])).unwrap();
        assert_eq!(sorted_versions(&versions), vec!["1.0-SNAPSHOT", "1.0", "1.0.0", "1.9", "1.10", "2.0"]);
    }

    #[test]
    fn test_generate_release_metadata() {
        let metadata = generate_release_metadata(&geckoview_listing(), frozen_now()).unwrap();
        let xml = MetadataDocument::Release(metadata).to_xml().unwrap();

        assert_eq!(String::from_utf8(xml.clone()).unwrap(), "<?xml version='1.0' encoding='UTF-8'?>\n\
            <metadata>\
                <groupId>org.mozilla.geckoview</groupId>\
                <artifactId>geckoview-nightly-x86</artifactId>\
                <versioning>\
                    <latest>65.0.20181029100346</latest>\
                    <release>65.0.20181029100346</release>\
                    <versions>\
                        <version>63.0.20180830100125</version>\
                        <version>63.0.20180830111743</version>\
                        <version>64.0.20181018103737</version>\
                        <version>64.0.20181019100100</version>\
                        <version>65.0.20181028102554</version>\
                        <version>65.0.20181029100346</version>\
                    </versions>\
                    <lastUpdated>20181029160030</lastUpdated>\
                </versioning>\
            </metadata>");

        assert_eq!(ChecksumPair::of(&xml), ChecksumPair {
            md5: "dbb16613f87336f53724b13ffe29f2b9".to_string(),
            sha1: "2e2e61779fe78ce649ddfca8838e06dc54b0e40e".to_string(),
        });
    }

    #[test]
    fn test_versions_survive_serialization() {
        let metadata = generate_release_metadata(&geckoview_listing(), frozen_now()).unwrap();
        let expected = metadata.versions.clone();

        let xml = MetadataDocument::Release(metadata).to_xml().unwrap();
        assert_eq!(parse_versions_element(&xml), expected);
    }

    #[test]
    fn test_generate_release_metadata_only_snapshots() {
        let keys = vec![
            "maven2/org/mozilla/components/browser-domains/0.30.0-SNAPSHOT/browser-domains-0.30.0-20181029.154529-1.pom".to_string(),
            "maven2/org/mozilla/components/browser-domains/0.29.0-SNAPSHOT/browser-domains-0.29.0-20181020.101010-1.pom".to_string(),
        ];
        let metadata = generate_release_metadata(&keys, frozen_now()).unwrap();

        assert_eq!(metadata.latest, "0.30.0-SNAPSHOT");
        assert_eq!(metadata.release, "");
        assert_eq!(metadata.versions, vec!["0.29.0-SNAPSHOT", "0.30.0-SNAPSHOT"]);
    }

    #[test]
    fn test_generate_release_metadata_mixed() {
        let keys = vec![
            "maven2/org/mozilla/components/browser-domains/0.30.0-SNAPSHOT/browser-domains-0.30.0-20181029.154529-1.pom".to_string(),
            "maven2/org/mozilla/components/browser-domains/0.29.0/browser-domains-0.29.0.pom".to_string(),
            "maven2/org/mozilla/components/browser-domains/0.30.0-SNAPSHOT/browser-domains-0.30.0-20181030.164630-2.pom".to_string(),
        ];
        let metadata = generate_release_metadata(&keys, frozen_now()).unwrap();

        assert_eq!(metadata.coordinates.to_string(), "org.mozilla.components:browser-domains");
        assert_eq!(metadata.latest, "0.30.0-SNAPSHOT");
        assert_eq!(metadata.release, "0.29.0");
        assert_eq!(metadata.versions, vec!["0.29.0", "0.30.0-SNAPSHOT"]);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::no_poms(vec![format!("{}63.0.20180830111743/geckoview-nightly-x86-63.0.20180830111743.jar", GECKOVIEW_FOLDER)])]
    fn test_generate_release_metadata_empty(#[case] keys: Vec<String>) {
        assert!(matches!(generate_release_metadata(&keys, frozen_now()), Err(MetadataError::EmptyFolderListing(_))));
    }

    #[test]
    fn test_generate_release_metadata_invalid_version() {
        let mut keys = geckoview_listing();
        keys.push(geckoview_pom("64.0-TESTING"));

        let error = generate_release_metadata(&keys, frozen_now()).unwrap_err();
        assert!(matches!(error, MetadataError::InvalidVersionFormat { path, .. } if path == geckoview_pom("64.0-TESTING")));
    }

    const SNAPSHOT_FOLDER: &str = "maven2/org/mozilla/components/browser-domains/0.30.0-SNAPSHOT/";

    fn pom_with_packaging(packaging: Option<&str>) -> Bytes {
        let packaging = packaging
            .map(|p| format!("<packaging>{}</packaging>", p))
            .unwrap_or_default();
        Bytes::from(format!(r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">{}</project>"#, packaging))
    }

    #[tokio::test]
    async fn test_generate_snapshot_listing_metadata() {
        let store = TransientArtifactStore::new();
        let key = format!("{}browser-domains-0.30.0-20181029.154529-1.pom", SNAPSHOT_FOLDER);
        store.insert("bucket", &key, pom_with_packaging(Some("aar"))).unwrap();

        let metadata = generate_snapshot_listing_metadata(&store, "bucket", &[key], frozen_now()).await.unwrap();
        let xml = String::from_utf8(MetadataDocument::SnapshotListing(metadata).to_xml().unwrap()).unwrap();

        assert_eq!(xml, "<?xml version='1.0' encoding='UTF-8'?>\n\
            <metadata>\
                <groupId>org.mozilla.components</groupId>\
                <artifactId>browser-domains</artifactId>\
                <version>0.30.0-SNAPSHOT</version>\
                <versioning>\
                    <snapshot>\
                        <timestamp>20181029.154529</timestamp>\
                        <buildNumber>1</buildNumber>\
                    </snapshot>\
                    <lastUpdated>20181029160030</lastUpdated>\
                    <snapshotVersions>\
                        <snapshotVersion>\
                            <extension>aar</extension>\
                            <value>0.30.0-20181029.154529-1</value>\
                            <updated>20181029154529</updated>\
                        </snapshotVersion>\
                    </snapshotVersions>\
                </versioning>\
            </metadata>");
    }

    #[tokio::test]
    async fn test_generate_snapshot_listing_metadata_ordering() {
        let store = TransientArtifactStore::new();
        let keys: Vec<String> = [
            ("browser-domains-0.30.0-20181030.164630-2.pom", Some("aar")),
            ("browser-domains-0.30.0-20181029.154529-1.pom", None),
            ("browser-domains-0.30.0-20181031.090000-3.pom", Some("aar")),
        ].iter()
            .map(|(file_name, packaging)| {
                let key = format!("{}{}", SNAPSHOT_FOLDER, file_name);
                store.insert("bucket", &key, pom_with_packaging(*packaging)).unwrap();
                key
            })
            .collect();

        let metadata = generate_snapshot_listing_metadata(&store, "bucket", &keys, frozen_now()).await.unwrap();

        let values: Vec<(&str, &str)> = metadata.snapshot_versions.iter()
            .map(|v| (v.value.as_str(), v.extension.as_str()))
            .collect();
        assert_eq!(values, vec![
            ("0.30.0-20181031.090000-3", "aar"),
            ("0.30.0-20181030.164630-2", "aar"),
            ("0.30.0-20181029.154529-1", "jar"),
        ]);
        assert_eq!(metadata.snapshot.build_number, 3);
        assert_eq!(metadata.snapshot.timestamp, metadata.snapshot_versions[0].updated);
    }

    #[tokio::test]
    async fn test_generate_snapshot_listing_metadata_failures() {
        let store = TransientArtifactStore::new();
        let valid = format!("{}browser-domains-0.30.0-20181029.154529-1.pom", SNAPSHOT_FOLDER);
        let invalid_xml = format!("{}browser-domains-0.30.0-20181030.164630-2.pom", SNAPSHOT_FOLDER);
        let missing = format!("{}browser-domains-0.30.0-20181031.090000-3.pom", SNAPSHOT_FOLDER);
        store.insert("bucket", &valid, pom_with_packaging(Some("aar"))).unwrap();
        store.insert("bucket", &invalid_xml, "<project><packaging>aar").unwrap();

        let result = generate_snapshot_listing_metadata(&store, "bucket", &[valid.clone(), invalid_xml.clone()], frozen_now()).await;
        assert!(matches!(result, Err(MetadataError::InvalidPom { key, .. }) if key == invalid_xml));

        let result = generate_snapshot_listing_metadata(&store, "bucket", &[valid.clone(), missing], frozen_now()).await;
        assert!(matches!(result, Err(MetadataError::StoreUnavailable(_))));

        let result = generate_snapshot_listing_metadata(&store, "bucket", &[], frozen_now()).await;
        assert!(matches!(result, Err(MetadataError::EmptyFolderListing(_))));

        let unresolved = format!("{}browser-domains-0.30.0-SNAPSHOT.pom", SNAPSHOT_FOLDER);
        let result = generate_snapshot_listing_metadata(&store, "bucket", &[unresolved], frozen_now()).await;
        assert!(matches!(result, Err(MetadataError::MalformedSnapshotFileName(_))));
    }
}
