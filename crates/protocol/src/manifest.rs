use serde::{Deserialize, Serialize};

use crate::version::ProductVersion;

/// Whether an offered upgrade must be applied before the client proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseKind {
    #[serde(rename = "optional")]
    Optional,
    #[serde(rename = "mandatory")]
    Mandatory,
}

/// One file shipped by a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub relative_path: String,
    pub length: i64,
    /// Hex SHA-256 of the file contents (empty means unknown).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

/// Per-version file listing and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseManifest {
    pub version: ProductVersion,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,
    pub kind: ReleaseKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub changelog: String,
}

impl ReleaseManifest {
    /// An empty manifest for `version`.
    pub fn new(version: ProductVersion, kind: ReleaseKind) -> Self {
        Self {
            version,
            files: Vec::new(),
            kind,
            changelog: String::new(),
        }
    }

    /// Folds a prior release's file list into this one.
    ///
    /// Persisted manifests are cumulative over all earlier releases: prior
    /// entries whose relative path this release does not redeclare are
    /// appended. Redeclared paths keep this release's entry.
    pub fn absorb(&mut self, prior: &ReleaseManifest) {
        for entry in &prior.files {
            if !self
                .files
                .iter()
                .any(|f| f.relative_path == entry.relative_path)
            {
                self.files.push(entry.clone());
            }
        }
    }

    /// Total byte length of all files in the release.
    pub fn total_length(&self) -> i64 {
        self.files.iter().map(|f| f.length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, length: i64) -> FileEntry {
        FileEntry {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            relative_path: path.to_string(),
            length,
            checksum: String::new(),
        }
    }

    fn manifest(version: &str, paths: &[&str]) -> ReleaseManifest {
        let mut m = ReleaseManifest::new(version.parse().unwrap(), ReleaseKind::Optional);
        m.files = paths.iter().map(|p| entry(p, 1)).collect();
        m
    }

    #[test]
    fn absorb_unions_file_lists() {
        let prior = manifest("1.1.0", &["a.txt"]);
        let mut next = manifest("1.2.0", &["b.txt"]);
        next.absorb(&prior);

        let paths: Vec<&str> = next.files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, ["b.txt", "a.txt"]);
    }

    #[test]
    fn absorb_keeps_own_entry_for_redeclared_path() {
        let mut prior = manifest("1.1.0", &["app.exe"]);
        prior.files[0].length = 100;
        let mut next = manifest("1.2.0", &["app.exe"]);
        next.files[0].length = 200;
        next.absorb(&prior);

        assert_eq!(next.files.len(), 1);
        assert_eq!(next.files[0].length, 200);
    }

    #[test]
    fn total_length_sums_entries() {
        let mut m = manifest("1.0.0", &["a", "b"]);
        m.files[0].length = 10;
        m.files[1].length = 32;
        assert_eq!(m.total_length(), 42);
    }

    #[test]
    fn serde_shape() {
        let mut m = manifest("1.2.0", &["bin/app.exe"]);
        m.kind = ReleaseKind::Mandatory;
        m.changelog = "fix B".into();

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["version"], "1.2.0");
        assert_eq!(json["kind"], "mandatory");
        assert_eq!(json["files"][0]["relativePath"], "bin/app.exe");

        let back: ReleaseManifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
