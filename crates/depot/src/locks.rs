use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Mutual-exclusion scopes keyed by artifact name.
///
/// A merge holds its artifact's lock for the whole run so chunk writes and a
/// second merge of the same artifact cannot race it. Operations on distinct
/// artifacts proceed independently.
#[derive(Default)]
pub struct ArtifactLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `artifact`, waiting while another holder is
    /// active. The guard is owned, so it can be held across awaits.
    pub async fn acquire(&self, artifact: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap();
            Arc::clone(map.entry(artifact.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
