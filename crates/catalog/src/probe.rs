use std::path::Path;

/// Reads the product version embedded in a served file's metadata.
///
/// How the version is embedded (PE version resources, ELF notes, archive
/// manifests) belongs to the build pipeline, not to the catalog; the catalog
/// only needs the extracted string.
pub trait VersionProbe: Send + Sync {
    /// The embedded product version of `path`, or `None` when the file
    /// carries no version metadata.
    fn product_version(&self, path: &Path) -> Option<String>;
}
