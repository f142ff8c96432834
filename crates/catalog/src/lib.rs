//! Release catalog: persists version manifests and decides which upgrade a
//! client should receive.
//!
//! The catalog root holds one `<version>.json` manifest and one `<version>/`
//! artifact subdirectory per release, both named exactly by the version
//! string. Write operations report through the
//! [`OpResult`](updrift_protocol::OpResult) envelope.

mod aggregate;
mod catalog;
mod probe;

pub use aggregate::{CHANGELOG_DIVIDER, ReleaseAggregator};
pub use catalog::VersionCatalog;
pub use probe::VersionProbe;
