use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::descriptor::TransferDescriptor;
use crate::events::{EventSink, TransferEvent};
use crate::source::ByteSource;
use crate::{CONNECT_TIMEOUT, COPY_BUFFER_SIZE, READ_TIMEOUT, TransferError};

/// Drives a range-based download to completion against a
/// [`TransferDescriptor`].
///
/// One downloader can run any number of transfers; each call is one attempt
/// with its own descriptor. Subscribers on [`events`](Self::events) receive
/// progress and speed notifications while the stream runs, then exactly one
/// completion notification per attempt.
pub struct ResumableDownloader {
    source: Arc<dyn ByteSource>,
    events: EventSink,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl ResumableDownloader {
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        Self {
            source,
            events: EventSink::new(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Overrides the connection/header-wait timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Overrides the per-read stall timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Subscription point for transfer notifications.
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Starts a download of `file_name` into `dest`, resuming from an
    /// existing partial file when one is present.
    ///
    /// Returns `true` once the partial file is promoted to `dest`. On any
    /// failure the bytes already flushed stay on disk for a later resume, an
    /// error notification carries the failure text, and `false` is returned;
    /// callers should treat that as "retry later".
    pub async fn start_or_resume(&self, file_name: &str, dest: &Path) -> bool {
        let mut descriptor = match TransferDescriptor::open(dest).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.events.emit(&TransferEvent::Error {
                    message: e.to_string(),
                });
                self.events
                    .emit(&TransferEvent::Completed { success: false });
                return false;
            }
        };
        self.drive(file_name, &mut descriptor).await
    }

    /// Resumes directly from a sentinel-suffixed partial file path.
    ///
    /// Returns `false` without starting an attempt when the path does not
    /// name a partial file.
    pub async fn resume(&self, file_name: &str, part_path: &Path) -> bool {
        let mut descriptor = match TransferDescriptor::from_part_path(part_path).await {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => return false,
            Err(e) => {
                warn!(part = %part_path.display(), error = %e, "could not rehydrate partial download");
                return false;
            }
        };
        self.drive(file_name, &mut descriptor).await
    }

    async fn drive(&self, file_name: &str, descriptor: &mut TransferDescriptor) -> bool {
        let success = match self.run(file_name, descriptor).await {
            Ok(()) => true,
            Err(e) => {
                descriptor.fail().await;
                warn!(file = file_name, error = %e, "download attempt failed");
                self.events.emit(&TransferEvent::Error {
                    message: e.to_string(),
                });
                false
            }
        };
        self.events.emit(&TransferEvent::Completed { success });
        success
    }

    async fn run(
        &self,
        file_name: &str,
        descriptor: &mut TransferDescriptor,
    ) -> Result<(), TransferError> {
        // Nothing has been committed yet, so a slow server simply aborts the
        // attempt here.
        let response = timeout(
            self.connect_timeout,
            self.source.open(file_name, descriptor.offset()),
        )
        .await
        .map_err(|_| TransferError::Transport("timed out waiting for the response".into()))??;
        descriptor
            .reconcile(
                response.declared_total,
                response.checksum.as_deref(),
                response.range_honored,
            )
            .await?;

        let mut body = response.body;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut window_start = Instant::now();
        let mut window_bytes: u64 = 0;

        loop {
            let read = timeout(self.read_timeout, body.read(&mut buf))
                .await
                .map_err(|_| TransferError::Stalled)??;
            if read == 0 {
                break;
            }

            descriptor.append(&buf[..read]).await?;
            self.events.emit(&TransferEvent::Progress {
                read: read as u64,
                received: descriptor.offset(),
                total: descriptor.total(),
            });

            window_bytes += read as u64;
            let elapsed = window_start.elapsed().as_secs();
            // Whole-second windows only; a sub-second window would distort
            // the average.
            if elapsed >= 1 {
                self.events.emit(&TransferEvent::Speed {
                    kib_per_sec: window_bytes as f64 / elapsed as f64 / 1024.0,
                });
                window_bytes = 0;
                window_start = Instant::now();
            }
        }

        descriptor.verify_and_promote().await?;
        info!(file = file_name, target = %descriptor.target().display(), "download completed");
        Ok(())
    }
}
