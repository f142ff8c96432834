use updrift_protocol::manifest::{ReleaseKind, ReleaseManifest};

/// Divider between per-release changelog entries in a coalesced offering.
pub const CHANGELOG_DIVIDER: &str = "-----------------------------------";

/// Coalesces the releases pending for a client into one upgrade offering.
pub struct ReleaseAggregator;

impl ReleaseAggregator {
    /// Returns the effective offering for `pending` releases, or `None` when
    /// nothing is pending.
    ///
    /// The greatest version is offered. Its kind is recomputed: Mandatory if
    /// any pending release is Mandatory, else Optional. Its changelog is the
    /// concatenation of every pending release's own changelog, lowest
    /// version first, each entry prefixed by its version label and separated
    /// by a divider line.
    pub fn coalesce(mut pending: Vec<ReleaseManifest>) -> Option<ReleaseManifest> {
        if pending.is_empty() {
            return None;
        }
        pending.sort_by(|a, b| a.version.cmp(&b.version));

        let kind = if pending.iter().any(|r| r.kind == ReleaseKind::Mandatory) {
            ReleaseKind::Mandatory
        } else {
            ReleaseKind::Optional
        };
        let changelog = pending
            .iter()
            .map(|r| format!("V{} changes:\n{}", r.version, r.changelog))
            .collect::<Vec<_>>()
            .join(&format!("\n{CHANGELOG_DIVIDER}\n"));

        let mut offering = pending.pop()?;
        offering.kind = kind;
        offering.changelog = changelog;
        Some(offering)
    }
}
