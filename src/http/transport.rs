use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::HttpClient;
use crate::runtime::Runtime;

/// Byte progress of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_received: u64,
    pub total_bytes: Option<u64>,
}

/// Receiver side of progress reports for one request.
pub type ProgressSink = mpsc::UnboundedSender<DownloadProgress>;

/// Performs one GET-to-file transfer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    ///
    /// Must fail with [`super::TransferCancelled`] once `cancel` fires.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<u64>;
}

/// [`Transport`] over HTTP(S), writing through the [`Runtime`].
pub struct HttpTransport<R: Runtime> {
    http: HttpClient,
    runtime: Arc<R>,
}

impl<R: Runtime> HttpTransport<R> {
    pub fn new(http: HttpClient, runtime: Arc<R>) -> Self {
        Self { http, runtime }
    }
}

#[async_trait]
impl<R: Runtime + 'static> Transport for HttpTransport<R> {
    #[tracing::instrument(skip(self, progress, cancel))]
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<u64> {
        let mut created = false;
        let result = self
            .http
            .download_file(
                url,
                || {
                    let writer = self
                        .runtime
                        .create_file(dest)
                        .with_context(|| format!("Failed to create download file at {:?}", dest))?;
                    created = true;
                    Ok(writer)
                },
                |bytes_received, total_bytes| {
                    if let Some(sink) = &progress {
                        // A dropped receiver only means nobody is watching
                        let _ = sink.send(DownloadProgress {
                            bytes_received,
                            total_bytes,
                        });
                    }
                },
                &cancel,
            )
            .await;

        if result.is_err() && created {
            debug!("Removing partial download {:?}", dest);
            if let Err(e) = self.runtime.remove_file(dest) {
                warn!("Failed to remove partial download {:?}: {}", dest, e);
            }
        }

        result
    }
}
