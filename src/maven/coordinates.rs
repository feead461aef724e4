use std::fmt::{Display, Formatter};

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MavenArtifactId(pub String);

/// dot-separated, e.g. "org.mozilla.geckoview"
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MavenGroupId(pub String);

/// The part of the Maven coordinates shared by all versions of an artifact, i.e. everything that
///  is stored in a single artifact folder.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ArtifactCoordinates {
    pub group_id: MavenGroupId,
    pub artifact_id: MavenArtifactId,
}

impl Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id.0, self.artifact_id.0)
    }
}
