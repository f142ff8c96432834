use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use updrift_protocol::OpResult;
use updrift_protocol::payload::{FilePayload, PayloadKind};

use crate::locks::ArtifactLocks;
use crate::paths::validate_relative_path;
use crate::{DepotError, STAGING_SUFFIX};

/// Stores uploaded whole files and indexed chunks under a depot root.
///
/// Writes are idempotent per artifact and per chunk index: bytes already on
/// disk are never rewritten, and the duplicate upload reports success. Chunks
/// for one artifact may arrive in any order and concurrently; each index
/// occupies its own file, so concurrent writes never interleave.
pub struct ChunkReceiver {
    root: PathBuf,
    locks: Arc<ArtifactLocks>,
}

impl ChunkReceiver {
    /// Creates a receiver rooted at `root`. Pass the same `locks` to the
    /// [`ChunkMerger`](crate::ChunkMerger) for this root so merges and chunk
    /// writes of one artifact serialize.
    pub fn new(root: impl Into<PathBuf>, locks: Arc<ArtifactLocks>) -> Self {
        Self {
            root: root.into(),
            locks,
        }
    }

    /// Stores one payload, optionally below `subdir`.
    pub async fn receive(&self, payload: &FilePayload, subdir: Option<&str>) -> OpResult {
        match self.store(payload, subdir).await {
            Ok(message) => OpResult::ok(message),
            Err(e) => OpResult::fail(format!("{}: upload failed: {e}", payload.file_name)),
        }
    }

    /// Stores a batch of payloads, collecting per-payload failures into the
    /// envelope's detail lines.
    pub async fn receive_all(&self, payloads: &[FilePayload], subdir: Option<&str>) -> OpResult {
        let mut failures = Vec::new();
        for payload in payloads {
            let outcome = self.receive(payload, subdir).await;
            if !outcome.is_ok() {
                failures.push(outcome.message);
            }
        }
        if failures.is_empty() {
            OpResult::ok("upload accepted")
        } else {
            OpResult::fail("upload failed").with_details(failures)
        }
    }

    async fn store(&self, payload: &FilePayload, subdir: Option<&str>) -> Result<String, DepotError> {
        validate_relative_path(&payload.file_name)?;
        if let Some(dir) = subdir {
            validate_relative_path(dir)?;
        }
        // The subdir-qualified relative path is the artifact identity: it
        // names the final file, the staging directory and the lock key.
        let artifact = match subdir {
            Some(dir) => format!("{dir}/{}", payload.file_name),
            None => payload.file_name.clone(),
        };
        match payload.kind {
            PayloadKind::Whole => self.store_whole(&artifact, payload).await,
            PayloadKind::Chunk { index } => self.store_chunk(&artifact, payload, index).await,
        }
    }

    async fn store_whole(
        &self,
        artifact: &str,
        payload: &FilePayload,
    ) -> Result<String, DepotError> {
        let path = self.root.join(artifact);
        if fs::try_exists(&path).await? {
            debug!(artifact, "artifact already present, skipping write");
            return Ok(format!("{artifact} already present"));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &payload.data).await?;
        info!(artifact, bytes = payload.data.len(), "stored whole artifact");
        Ok(format!("{artifact} stored"))
    }

    async fn store_chunk(
        &self,
        artifact: &str,
        payload: &FilePayload,
        index: u32,
    ) -> Result<String, DepotError> {
        let _guard = self.locks.acquire(artifact).await;

        let staging = self.root.join(format!("{artifact}{STAGING_SUFFIX}"));
        fs::create_dir_all(&staging).await?;
        let chunk_path = staging.join(index.to_string());
        if fs::try_exists(&chunk_path).await? {
            debug!(artifact, index, "chunk already present, skipping write");
            return Ok(format!("chunk {index} of {artifact} already present"));
        }
        fs::write(&chunk_path, &payload.data).await?;
        debug!(artifact, index, bytes = payload.data.len(), "staged chunk");
        Ok(format!("chunk {index} of {artifact} staged"))
    }
}
