use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use updrift_protocol::OpResult;
use updrift_protocol::manifest::ReleaseManifest;
use updrift_protocol::version::ProductVersion;

use crate::aggregate::ReleaseAggregator;
use crate::probe::VersionProbe;

/// Persists release manifests and answers upgrade-eligibility queries.
///
/// Each component owns an explicit root path; there is no process-wide
/// catalog location.
pub struct VersionCatalog {
    root: PathBuf,
}

impl VersionCatalog {
    /// Creates a catalog rooted at `root`. The directory itself is created
    /// on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn root_dir(&self) -> io::Result<&Path> {
        fs::create_dir_all(&self.root)?;
        Ok(&self.root)
    }

    fn manifest_path(&self, version: &ProductVersion) -> PathBuf {
        self.root.join(format!("{version}.json"))
    }

    fn artifact_dir(&self, version: &ProductVersion) -> PathBuf {
        self.root.join(version.to_string())
    }

    /// Every parseable manifest under the root, ascending by numeric
    /// version. Unreadable manifests are skipped with a warning.
    pub fn list_versions(&self) -> io::Result<Vec<ReleaseManifest>> {
        let root = self.root_dir()?;
        let mut manifests = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path).and_then(|data| {
                serde_json::from_str::<ReleaseManifest>(&data).map_err(io::Error::other)
            });
            match parsed {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => warn!(manifest = %path.display(), error = %e, "skipping unreadable manifest"),
            }
        }
        manifests.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(manifests)
    }

    /// Records a release.
    ///
    /// Persisted manifests are cumulative: when earlier releases exist, the
    /// greatest one's file list is folded into the new manifest before it is
    /// written. An existing manifest of the same version is never
    /// overwritten — the call reports success for it. Success requires both
    /// the manifest file and the artifact subdirectory to exist afterward.
    pub fn create_version(&self, manifest: &ReleaseManifest) -> OpResult {
        let mut manifest = manifest.clone();
        match self.persist_version(&mut manifest) {
            Ok(()) => OpResult::ok(format!("created version {}", manifest.version)),
            Err(e) => OpResult::fail(e.to_string()),
        }
    }

    fn persist_version(&self, manifest: &mut ReleaseManifest) -> io::Result<()> {
        if let Some(prior) = self.list_versions()?.last() {
            manifest.absorb(prior);
        }

        // Two-step, order-sensitive persistence: manifest first, then the
        // artifact directory. Both must exist for the version to count.
        let path = self.manifest_path(&manifest.version);
        let dir = self.artifact_dir(&manifest.version);
        if !path.exists() {
            let json = serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?;
            fs::write(&path, json)?;
        }
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        if path.is_file() && dir.is_dir() {
            info!(version = %manifest.version, files = manifest.files.len(), "recorded release");
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "version {} was not fully persisted",
                manifest.version
            )))
        }
    }

    /// Removes a release's manifest and artifact directory. Success requires
    /// both to be absent afterward.
    pub fn delete_version(&self, version: &ProductVersion) -> OpResult {
        let path = self.manifest_path(version);
        let dir = self.artifact_dir(version);
        let removed = (|| -> io::Result<bool> {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            Ok(!path.exists() && !dir.exists())
        })();

        match removed {
            Ok(true) => {
                info!(version = %version, "deleted release");
                OpResult::ok(format!("deleted version {version}"))
            }
            Ok(false) => OpResult::fail(format!("version {version} was not fully deleted")),
            Err(e) => OpResult::fail(e.to_string()),
        }
    }

    /// Removes a single served file from the catalog root.
    pub fn delete_file(&self, file_name: &str) -> OpResult {
        if !is_safe_name(file_name) {
            return OpResult::fail(format!("invalid file name: {file_name}"));
        }
        let path = self.root.join(file_name);
        let removed = (|| -> io::Result<bool> {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            Ok(!path.exists())
        })();

        match removed {
            Ok(true) => OpResult::ok(format!("deleted file {file_name}")),
            Ok(false) => OpResult::fail(format!("file {file_name} was not deleted")),
            Err(e) => OpResult::fail(e.to_string()),
        }
    }

    /// The coalesced upgrade offering for a client at `client_version`, or
    /// `None` when the client is current. Unparsable input yields `None`,
    /// not an error.
    pub fn check_version(&self, client_version: &str) -> Option<ReleaseManifest> {
        let client = ProductVersion::parse(client_version)?;
        let manifests = match self.list_versions() {
            Ok(manifests) => manifests,
            Err(e) => {
                warn!(error = %e, "could not enumerate releases");
                return None;
            }
        };
        let pending: Vec<ReleaseManifest> = manifests
            .into_iter()
            .filter(|m| m.version > client)
            .collect();
        ReleaseAggregator::coalesce(pending)
    }

    /// Whether any known release strictly exceeds `client_version`.
    /// Unparsable input yields `false`, not an error.
    pub fn upgradeable(&self, client_version: &str) -> bool {
        let Some(client) = ProductVersion::parse(client_version) else {
            return false;
        };
        match self.list_versions() {
            Ok(manifests) => manifests.last().is_some_and(|m| m.version > client),
            Err(e) => {
                warn!(error = %e, "could not enumerate releases");
                false
            }
        }
    }

    /// Reads the embedded product version of a served file through `probe`.
    pub fn file_version(&self, file_name: &str, probe: &dyn VersionProbe) -> OpResult {
        if !is_safe_name(file_name) {
            return OpResult::fail(format!("invalid file name: {file_name}"));
        }
        let path = self.root.join(file_name);
        if !path.is_file() {
            return OpResult::fail(format!("file not found: {file_name}"));
        }
        match probe.product_version(&path) {
            Some(version) => OpResult::ok(version),
            None => OpResult::fail(format!("{file_name} carries no product version")),
        }
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
