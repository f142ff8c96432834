use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::TransferError;

/// Sentinel suffix marking an in-flight partial download.
pub const PART_SUFFIX: &str = ".part";

const META_SUFFIX: &str = ".part.meta";

/// Lifecycle of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    New,
    Resuming,
    Verifying,
    Completed,
    Failed,
}

/// Resume bookkeeping persisted next to the partial file, so a later attempt
/// can detect that the server's content changed in between.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
}

/// State of one resumable download: destination, partial file, declared
/// length, checksum and received byte count.
///
/// The partial file's on-disk size always equals the received count; every
/// appended buffer is flushed before the count advances. The partial file is
/// removed only by promotion to the final path — a failed attempt leaves it
/// in place for the next resume.
pub struct TransferDescriptor {
    target: PathBuf,
    part: PathBuf,
    meta_path: PathBuf,
    total: Option<u64>,
    checksum: Option<String>,
    received: u64,
    state: TransferState,
    file: Option<File>,
}

impl TransferDescriptor {
    /// Creates a descriptor for a download into `target`, picking up an
    /// existing partial file when one is present.
    pub async fn open(target: &Path) -> std::io::Result<Self> {
        let part = append_suffix(target, PART_SUFFIX);
        if let Some(parent) = part.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        Self::rehydrate(target.to_path_buf(), part).await
    }

    /// Rehydrates a descriptor directly from a sentinel-suffixed partial
    /// path. Returns `None` when the path lacks the suffix or no partial
    /// file exists there.
    pub async fn from_part_path(part: &Path) -> std::io::Result<Option<Self>> {
        let Some(name) = part.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some(stem) = name.strip_suffix(PART_SUFFIX) else {
            return Ok(None);
        };
        if stem.is_empty() || !fs::try_exists(part).await? {
            return Ok(None);
        }
        let target = part.with_file_name(stem);
        Ok(Some(Self::rehydrate(target, part.to_path_buf()).await?))
    }

    async fn rehydrate(target: PathBuf, part: PathBuf) -> std::io::Result<Self> {
        let meta_path = append_suffix(&target, META_SUFFIX);
        let received = match fs::metadata(&part).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        let persisted = if received > 0 {
            load_meta(&meta_path).await
        } else {
            PartMeta::default()
        };
        let state = if received > 0 {
            TransferState::Resuming
        } else {
            TransferState::New
        };
        Ok(Self {
            target,
            part,
            meta_path,
            total: persisted.total,
            checksum: persisted.checksum,
            received,
            state,
            file: None,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn part_path(&self) -> &Path {
        &self.part
    }

    /// Bytes received so far; the resume offset for the next range request.
    pub fn offset(&self) -> u64 {
        self.received
    }

    /// Declared total length, once a response (or prior attempt) supplied it.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Expected content checksum, once known.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Reconciles the response's declared length and checksum against values
    /// recorded by this or a prior attempt.
    ///
    /// A disagreement means the server's content changed mid-resumption: the
    /// attempt fails and the stale partial file is left untouched, so the
    /// caller can decide what to do with it. When the server ignored the
    /// range request while bytes are already on disk, those bytes are
    /// discarded and the transfer restarts from byte 0.
    pub async fn reconcile(
        &mut self,
        declared_total: Option<u64>,
        checksum: Option<&str>,
        range_honored: bool,
    ) -> Result<(), TransferError> {
        if let (Some(known), Some(declared)) = (self.total, declared_total)
            && known != declared
        {
            self.state = TransferState::Failed;
            return Err(TransferError::ContentChanged);
        }
        if let (Some(known), Some(remote)) = (self.checksum.as_deref(), checksum)
            && known != remote
        {
            self.state = TransferState::Failed;
            return Err(TransferError::ContentChanged);
        }

        if !range_honored && self.received > 0 {
            fs::remove_file(&self.part).await?;
            self.received = 0;
            self.state = TransferState::New;
        }

        if self.total.is_none() {
            self.total = declared_total;
        }
        if self.checksum.is_none() {
            self.checksum = checksum.map(str::to_owned);
        }
        self.save_meta().await?;
        Ok(())
    }

    /// Appends one buffer to the partial file and advances the received
    /// count once the bytes are flushed.
    pub async fn append(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.part)
                .await?;
            self.file = Some(file);
        }
        let Some(file) = self.file.as_mut() else {
            return Err(std::io::Error::other("partial file handle missing"));
        };
        file.write_all(buf).await?;
        file.flush().await?;
        self.received += buf.len() as u64;
        Ok(())
    }

    /// Verifies the completed partial file against the recorded checksum,
    /// when one is known, then promotes it to the final path and removes the
    /// resume bookkeeping.
    pub async fn verify_and_promote(&mut self) -> Result<(), TransferError> {
        self.state = TransferState::Verifying;
        self.file = None;
        if let Some(expected) = self.checksum.as_deref() {
            let actual = crate::checksum::checksum_file(&self.part)?;
            if actual != expected {
                self.state = TransferState::Failed;
                return Err(TransferError::ChecksumMismatch);
            }
        }
        fs::rename(&self.part, &self.target).await?;
        let _ = fs::remove_file(&self.meta_path).await;
        self.state = TransferState::Completed;
        Ok(())
    }

    /// Marks the attempt failed, keeping the partial file and bookkeeping on
    /// disk for a later resume.
    pub async fn fail(&mut self) {
        self.file = None;
        self.state = TransferState::Failed;
        if let Err(e) = self.save_meta().await {
            warn!(part = %self.part.display(), error = %e, "could not persist resume metadata");
        }
    }

    async fn save_meta(&self) -> std::io::Result<()> {
        if self.total.is_none() && self.checksum.is_none() {
            return Ok(());
        }
        let meta = PartMeta {
            total: self.total,
            checksum: self.checksum.clone(),
        };
        let json = serde_json::to_string(&meta).map_err(std::io::Error::other)?;
        fs::write(&self.meta_path, json).await
    }
}

async fn load_meta(path: &Path) -> PartMeta {
    match fs::read_to_string(path).await {
        Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
        Err(_) => PartMeta::default(),
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
