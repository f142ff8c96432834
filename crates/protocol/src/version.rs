use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Numeric dotted product version, e.g. `1.10.0`.
///
/// Ordering is numeric per component, never lexicographic: `1.9.0` sorts
/// before `1.10.0`. A version that is a strict prefix of a longer one sorts
/// first, so `1.0` < `1.0.0`. `Display` reproduces the parsed string exactly,
/// which is what names manifest files and artifact directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductVersion {
    parts: Vec<u64>,
}

/// Error returned for a malformed version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError(String);

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version string: {:?}", self.0)
    }
}

impl std::error::Error for VersionParseError {}

impl ProductVersion {
    /// Parses a version string, `None` on malformed input.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// The numeric components, most significant first.
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl FromStr for ProductVersion {
    type Err = VersionParseError;

    /// Accepts two or more dot-separated base-10 components. Components with
    /// leading zeros are rejected so parsing and formatting round-trip
    /// exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('.')
            .map(parse_component)
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(|| VersionParseError(s.to_string()))?;
        if parts.len() < 2 {
            return Err(VersionParseError(s.to_string()));
        }
        Ok(Self { parts })
    }
}

fn parse_component(component: &str) -> Option<u64> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if component.len() > 1 && component.starts_with('0') {
        return None;
    }
    component.parse().ok()
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl Ord for ProductVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Element-wise numeric comparison; a strict prefix sorts first.
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for ProductVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for ProductVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProductVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
