use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{MetadataError, MetadataResult};
use crate::maven::coordinates::*;

lazy_static! {
    static ref TIMESTAMP_REGEX: Regex = Regex::new(r"^\d{8}\.\d{6}$").unwrap();
}

/// Leading folders that hold a whole repository and are not part of the groupId
pub const REPOSITORY_ROOTS: [&str; 2] = ["maven", "maven2"];

pub const SNAPSHOT_MARKER: &str = "-SNAPSHOT";
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Splits an object key of the form `<group path>/<artifactId>/<version>/<file name>` into its
///  segments, rejecting keys that are too short to contain all of these. Empty segments (leading,
///  trailing or doubled '/') are rejected as well.
fn segments(key: &str) -> MetadataResult<Vec<&str>> {
    let segments: Vec<&str> = key.split('/').collect();

    if segments.len() < 4 || segments.iter().any(|s| s.is_empty()) {
        return Err(MetadataError::MalformedKey(key.to_string()));
    }
    Ok(segments)
}

fn strip_segments(key: &str, number_of_segments: usize) -> MetadataResult<String> {
    let segments = segments(key)?;
    let mut folder = segments[..segments.len() - number_of_segments].join("/");
    folder.push('/');
    Ok(folder)
}

/// The folder holding all versions of an artifact, with a trailing '/'
pub fn artifact_folder(key: &str) -> MetadataResult<String> {
    strip_segments(key, 2)
}

/// The folder holding the files of a single version, with a trailing '/'
pub fn version_folder(key: &str) -> MetadataResult<String> {
    strip_segments(key, 1)
}

pub fn group_id(key: &str) -> MetadataResult<MavenGroupId> {
    let segments = segments(key)?;
    let mut group_segments = &segments[..segments.len() - 3];

    // artifacts are usually uploaded below 'maven2/' which is not part of the groupId
    if let Some(first) = group_segments.first() {
        if REPOSITORY_ROOTS.contains(first) {
            group_segments = &group_segments[1..];
        }
    }
    Ok(MavenGroupId(group_segments.join(".")))
}

pub fn artifact_id(key: &str) -> MetadataResult<MavenArtifactId> {
    let segments = segments(key)?;
    Ok(MavenArtifactId(segments[segments.len() - 3].to_string()))
}

/// The name of the version folder, including a "-SNAPSHOT" suffix if there is one
pub fn version(key: &str) -> MetadataResult<String> {
    let segments = segments(key)?;
    Ok(segments[segments.len() - 2].to_string())
}

pub fn coordinates(key: &str) -> MetadataResult<ArtifactCoordinates> {
    Ok(ArtifactCoordinates {
        group_id: group_id(key)?,
        artifact_id: artifact_id(key)?,
    })
}

/// NB: this looks for the marker anywhere in the key, not only in the version folder. A groupId
///  or artifactId containing "-SNAPSHOT" is classified as a snapshot as well.
pub fn is_snapshot(key: &str) -> bool {
    key.contains(SNAPSHOT_MARKER)
}

pub fn is_pom(key: &str) -> bool {
    key.ends_with(".pom")
}

/// The key of a file placed directly inside `folder`, regardless of whether `folder` has a
///  trailing '/'
pub fn file_key(folder: &str, file_name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), file_name)
}

/// The parts of a timestamped snapshot file name,
///  `<artifactId>-<base version>-<yyyyMMdd.HHmmss>-<buildNumber>.pom`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SnapshotFileName {
    pub base_version: String,
    pub timestamp: NaiveDateTime,
    pub build_number: u32,
}

pub fn parse_snapshot_file_name(key: &str) -> MetadataResult<SnapshotFileName> {
    let malformed = || MetadataError::MalformedSnapshotFileName(key.to_string());

    let file_name = match key.rfind('/') {
        Some(last_slash) => &key[last_slash+1..],
        None => key,
    };
    let file_name = file_name.strip_suffix(".pom")
        .ok_or_else(malformed)?;

    let parts: Vec<&str> = file_name.rsplitn(4, '-').collect();
    if parts.len() < 4 {
        return Err(malformed());
    }
    let (build_number, timestamp, base_version) = (parts[0], parts[1], parts[2]);

    let build_number = build_number.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(malformed)?;

    if !TIMESTAMP_REGEX.is_match(timestamp) {
        return Err(malformed());
    }
    let timestamp = NaiveDateTime::parse_from_str(timestamp, SNAPSHOT_TIMESTAMP_FORMAT)
        .map_err(|_| malformed())?;

    if base_version.is_empty() {
        return Err(malformed());
    }

    Ok(SnapshotFileName {
        base_version: base_version.to_string(),
        timestamp,
        build_number,
    })
}
