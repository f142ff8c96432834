//! Server-side staging and assembly of uploaded artifacts.
//!
//! Uploads arrive as whole files or as indexed chunks. Chunks collect in a
//! per-artifact staging directory until a merge concatenates them, in numeric
//! index order, into the final artifact. Every public write operation reports
//! through the [`OpResult`](updrift_protocol::OpResult) envelope; errors do
//! not cross this boundary.

mod locks;
mod merge;
mod paths;
mod receiver;

pub use locks::ArtifactLocks;
pub use merge::ChunkMerger;
pub use paths::validate_relative_path;
pub use receiver::ChunkReceiver;

/// Suffix of the per-artifact staging directory holding indexed chunks.
pub const STAGING_SUFFIX: &str = ".staging";

/// Fixed copy buffer used when concatenating chunks.
pub const COPY_BUFFER_SIZE: usize = 80 * 1024;

/// Errors produced by depot operations before envelope conversion.
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("no staged chunks for {0}")]
    MissingStaging(String),

    #[error("chunk {0} is missing from the staged set")]
    MissingChunk(u64),

    #[error("unexpected file in staging directory: {0}")]
    BadChunkName(String),
}
