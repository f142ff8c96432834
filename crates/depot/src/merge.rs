use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use updrift_protocol::OpResult;

use crate::locks::ArtifactLocks;
use crate::paths::validate_relative_path;
use crate::{COPY_BUFFER_SIZE, DepotError, STAGING_SUFFIX};

/// Assembles a staged chunk set into its final artifact.
pub struct ChunkMerger {
    root: PathBuf,
    locks: Arc<ArtifactLocks>,
}

impl ChunkMerger {
    /// Creates a merger rooted at `root`, sharing `locks` with the receiver
    /// for the same root.
    pub fn new(root: impl Into<PathBuf>, locks: Arc<ArtifactLocks>) -> Self {
        Self {
            root: root.into(),
            locks,
        }
    }

    /// Concatenates the staged chunks of `artifact`, lowest index first,
    /// into the final artifact path.
    ///
    /// The staged set must be the contiguous run 0..N-1; a gap fails the
    /// merge before anything is written. Whatever the outcome, the staging
    /// directory is removed afterward — a failed merge discards every staged
    /// chunk and the caller has to re-upload from scratch.
    pub async fn merge(&self, artifact: &str) -> OpResult {
        if let Err(e) = validate_relative_path(artifact) {
            return OpResult::fail(format!("merge of {artifact} failed: {e}"));
        }
        let _guard = self.locks.acquire(artifact).await;

        let staging = self.root.join(format!("{artifact}{STAGING_SUFFIX}"));
        match fs::metadata(&staging).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return OpResult::fail(format!("no staged chunks for {artifact}")),
        }

        let target = self.root.join(artifact);
        let outcome = concatenate(&staging, &target).await;

        // The staging area goes away no matter what happened; a half-merged
        // chunk set is never kept.
        if let Err(e) = fs::remove_dir_all(&staging).await {
            warn!(artifact, error = %e, "could not remove staging directory");
        }

        match outcome {
            Ok(chunks) => {
                info!(artifact, chunks, "merged staged chunks");
                OpResult::ok(format!("merged {chunks} chunks into {artifact}"))
            }
            Err(e) => {
                // Never leave a half-written artifact behind; it would block
                // the re-upload as "already present".
                let _ = fs::remove_file(&target).await;
                OpResult::fail(format!(
                    "merge of {artifact} failed: {e}; staged chunks were discarded, re-upload from scratch"
                ))
            }
        }
    }
}

/// Copies every staged chunk into `target` in numeric index order.
async fn concatenate(staging: &Path, target: &Path) -> Result<usize, DepotError> {
    let mut indices = Vec::new();
    let mut entries = fs::read_dir(staging).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let index = name
            .to_str()
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| DepotError::BadChunkName(name.to_string_lossy().into_owned()))?;
        indices.push(index);
    }

    // Numeric order: chunk "10" comes after chunk "2".
    indices.sort_unstable();
    for (expected, index) in indices.iter().enumerate() {
        if *index != expected as u64 {
            return Err(DepotError::MissingChunk(expected as u64));
        }
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut out = fs::File::create(target).await?;
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    for index in &indices {
        let mut chunk = fs::File::open(staging.join(index.to_string())).await?;
        loop {
            let read = chunk.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            out.write_all(&buf[..read]).await?;
        }
    }
    out.flush().await?;
    Ok(indices.len())
}
