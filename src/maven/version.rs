use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(r"^(?P<numbers>\d+(?:\.\d+)+)(?P<snapshot>-SNAPSHOT)?$").unwrap();
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("{0:?} does not match the Maven version pattern")]
pub struct VersionParseError(pub String);

/// A version as used in the folder names of a Maven repository: dot-separated numbers, optionally
///  followed by "-SNAPSHOT".
///
/// Versions are ordered by their numbers, missing trailing numbers counting as zero. A snapshot is
///  less than the release with the same numbers, otherwise the qualifier does not matter. This
///  means that "1.0" and "1.0.0" are *equal* while having different string representations.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    numbers: Vec<u64>,
    is_snapshot: bool,
}

impl MavenVersion {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    pub fn is_snapshot(&self) -> bool {
        self.is_snapshot
    }
}

impl FromStr for MavenVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_REGEX.captures(s)
            .ok_or_else(|| VersionParseError(s.to_string()))?;

        let numbers = captures["numbers"]
            .split('.')
            .map(|n| n.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionParseError(s.to_string()))?; // overflow

        Ok(MavenVersion {
            raw: s.to_string(),
            numbers,
            is_snapshot: captures.name("snapshot").is_some(),
        })
    }
}

impl Display for MavenVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        let padded = |numbers: &[u64], i: usize| numbers.get(i).copied().unwrap_or(0);

        for i in 0..len {
            match padded(&self.numbers, i).cmp(&padded(&other.numbers, i)) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }

        // snapshot < release
        other.is_snapshot.cmp(&self.is_snapshot)
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use rstest::*;
    use super::*;

    fn v(s: &str) -> MavenVersion {
        s.parse().unwrap()
    }

    #[rstest]
    #[case::two_numbers("64.0", &[64, 0], false)]
    #[case::nightly("63.0.20180830111743", &[63, 0, 20180830111743], false)]
    #[case::snapshot("0.30.0-SNAPSHOT", &[0, 30, 0], true)]
    #[case::four_numbers("1.2.3.4", &[1, 2, 3, 4], false)]
    fn test_parse(#[case] s: &str, #[case] numbers: &[u64], #[case] is_snapshot: bool) {
        let version = v(s);
        assert_eq!(version.numbers(), numbers);
        assert_eq!(version.is_snapshot(), is_snapshot);
        assert_eq!(version.to_string(), s);
    }

    #[rstest]
    #[case::other_qualifier("64.0-TESTING")]
    #[case::lowercase_snapshot("1.0-snapshot")]
    #[case::single_number("64")]
    #[case::empty("")]
    #[case::trailing_dot("1.0.")]
    #[case::leading_v("v1.0")]
    #[case::overflow("1.99999999999999999999999")]
    fn test_parse_invalid(#[case] s: &str) {
        assert_eq!(s.parse::<MavenVersion>().unwrap_err(), VersionParseError(s.to_string()));
    }

    #[rstest]
    #[case::major("2.0", "1.9", Ordering::Greater)]
    #[case::numeric_not_lexical("1.10", "1.9", Ordering::Greater)]
    #[case::padding("1.0", "1.0.0", Ordering::Equal)]
    #[case::padding_greater("1.0.1", "1.0", Ordering::Greater)]
    #[case::snapshot_below_release("1.0-SNAPSHOT", "1.0", Ordering::Less)]
    #[case::snapshot_below_padded_release("1.0-SNAPSHOT", "1.0.0", Ordering::Less)]
    #[case::snapshot_above_older_release("1.1-SNAPSHOT", "1.0", Ordering::Greater)]
    #[case::snapshots("1.1-SNAPSHOT", "1.0-SNAPSHOT", Ordering::Greater)]
    #[case::equal_snapshots("1.0-SNAPSHOT", "1.0.0-SNAPSHOT", Ordering::Equal)]
    #[case::nightlies("65.0.20181028102554", "65.0.20181029100346", Ordering::Less)]
    fn test_ordering(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(v(a).cmp(&v(b)), expected);
        assert_eq!(v(b).cmp(&v(a)), expected.reverse());
    }
}
