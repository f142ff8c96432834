use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::source::{ByteSource, SourceResponse};
use crate::{CONNECT_TIMEOUT, TransferError};

/// Response header carrying the hex SHA-256 of the complete object.
pub const CHECKSUM_HEADER: &str = "x-checksum-sha256";

/// [`ByteSource`] over HTTP range requests.
///
/// The endpoint takes the file name as a `fileName` query parameter and is
/// expected to answer a `Range: bytes=N-` request with `206` plus a
/// `Content-Range` when it supports resumption, or the whole object when it
/// does not.
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    /// Creates a source for `base_url`, the server's download endpoint.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransferError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn open(&self, file_name: &str, offset: u64) -> Result<SourceResponse, TransferError> {
        let url = format!("{}?fileName={}", self.base_url, file_name);
        let response = self
            .client
            .get(&url)
            .header(RANGE, format!("bytes={offset}-"))
            .send()
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Transport(format!(
                "HTTP {} for {file_name}",
                status.as_u16()
            )));
        }

        let content_range = header_str(&response, CONTENT_RANGE.as_str());
        let content_length = header_str(&response, CONTENT_LENGTH.as_str());
        let range_honored = content_range.is_some();
        let declared_total = declared_total(content_range.as_deref(), content_length.as_deref());
        let checksum = header_str(&response, CHECKSUM_HEADER);

        debug!(
            file = file_name,
            offset, range_honored, declared_total, "download stream opened"
        );

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(SourceResponse {
            declared_total,
            range_honored,
            checksum,
            body: Box::new(StreamReader::new(stream)),
        })
    }
}

fn header_str(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Total object length from the response headers.
///
/// `Content-Range: bytes a-b/total` wins when present; its absence means the
/// server ignored the range, so `Content-Length` covers the whole object.
fn declared_total(content_range: Option<&str>, content_length: Option<&str>) -> Option<u64> {
    if let Some(range) = content_range {
        return range.rsplit('/').next().and_then(|t| t.parse().ok());
    }
    content_length.and_then(|l| l.parse().ok())
}
