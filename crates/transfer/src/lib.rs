//! Resumable, integrity-checked download client.
//!
//! A download streams ranged reads from a [`ByteSource`] into a
//! sentinel-suffixed partial file next to its destination, so an interrupted
//! transfer picks up where it stopped. Progress, speed, completion and error
//! notifications are broadcast through an [`EventSink`].

mod checksum;
mod descriptor;
mod download;
mod events;
mod http;
mod source;

pub use checksum::{checksum_bytes, checksum_file};
pub use descriptor::{PART_SUFFIX, TransferDescriptor, TransferState};
pub use download::ResumableDownloader;
pub use events::{EventCallback, EventSink, TransferEvent};
pub use http::{CHECKSUM_HEADER, HttpSource};
pub use source::{ByteSource, SourceResponse};

use std::time::Duration;

/// Fixed streaming buffer: 80 KiB.
pub const COPY_BUFFER_SIZE: usize = 80 * 1024;

/// Connection/header-wait timeout, applied before any bytes are committed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-read stall timeout; aborts the attempt but keeps written bytes.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced while driving a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("server content changed during resume")]
    ContentChanged,

    #[error("checksum mismatch on completed download")]
    ChecksumMismatch,

    #[error("timed out waiting for data")]
    Stalled,
}
