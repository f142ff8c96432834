use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::TransferError;

/// First response to a download request.
pub struct SourceResponse {
    /// Total object length declared by the server, when known. For an
    /// honored range this is the full object length, not the remainder.
    pub declared_total: Option<u64>,
    /// Whether the requested byte range was honored. When it was not, the
    /// body is the whole object from byte 0.
    pub range_honored: bool,
    /// Hex SHA-256 of the complete object, when the server carries one.
    pub checksum: Option<String>,
    /// The (possibly partial) object body.
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

/// Serves update files as byte streams with optional range offsets.
///
/// [`HttpSource`](crate::HttpSource) is the production implementation; tests
/// drive in-process sources.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Opens `file_name` for reading at `offset` bytes.
    async fn open(&self, file_name: &str, offset: u64) -> Result<SourceResponse, TransferError>;
}
