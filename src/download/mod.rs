//! Bounded concurrent acquisition of package installers.
//!
//! A batch of [`DownloadRequest`]s is handed to [`Downloader::download`],
//! which starts at most `max_concurrent` transfers at a time, in submission
//! order, and reports exactly one [`DownloadEvent`] per request on the
//! returned [`DownloadBatch`] stream. Events arrive in completion order.
//!
//! # Example
//!
//! ```ignore
//! let downloader = Downloader::new(Arc::new(transport));
//! let cancel = CancellationToken::new();
//! let mut batch = downloader.download(requests, 4, cancel.clone());
//!
//! while let Some(event) = batch.next_event().await {
//!     match event {
//!         DownloadEvent::Completed(result) => install(result.path),
//!         DownloadEvent::Failed { package, error } => report(package, error),
//!         DownloadEvent::Cancelled { .. } => {}
//!     }
//! }
//! ```

mod request;

use futures_util::{FutureExt, Stream};
use log::{debug, info, warn};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::http::{Transport, is_cancelled};
use crate::package::Package;

pub use crate::http::{DownloadProgress, ProgressSink};
pub use request::{DownloadRequest, file_name_for};

/// A completed download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    pub package: Package,
    pub path: PathBuf,
}

/// Terminal outcome of one request.
#[derive(Debug)]
pub enum DownloadEvent {
    Completed(DownloadResult),
    Failed {
        package: Package,
        error: anyhow::Error,
    },
    /// The batch was cancelled before this request finished.
    Cancelled { package: Package },
}

impl DownloadEvent {
    pub fn package(&self) -> &Package {
        match self {
            DownloadEvent::Completed(result) => &result.package,
            DownloadEvent::Failed { package, .. } => package,
            DownloadEvent::Cancelled { package } => package,
        }
    }
}

/// Downloads installers through a [`Transport`].
pub struct Downloader<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport + 'static> Downloader<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Start downloading `requests` with at most `max_concurrent` transfers
    /// in flight. A limit of zero is treated as one.
    ///
    /// Cancelling `cancel` aborts in-flight transfers and reports every
    /// request that has not finished yet as cancelled. Dropping the returned
    /// batch cancels it too. Must be called from within a Tokio runtime.
    pub fn download(
        &self,
        requests: Vec<DownloadRequest>,
        max_concurrent: usize,
        cancel: CancellationToken,
    ) -> DownloadBatch {
        let max_concurrent = max_concurrent.max(1);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!(
            "Downloading {} package(s), {} at a time",
            requests.len(),
            max_concurrent
        );

        let batch_cancel = cancel.child_token();
        let guard = batch_cancel.clone().drop_guard();

        tokio::spawn(dispatch(
            Arc::clone(&self.transport),
            requests,
            max_concurrent,
            batch_cancel,
            events_tx,
        ));

        DownloadBatch {
            events: events_rx,
            _cancel_on_drop: guard,
        }
    }
}

/// Stream of [`DownloadEvent`]s for one batch. Ends once every request has
/// reported.
pub struct DownloadBatch {
    events: mpsc::UnboundedReceiver<DownloadEvent>,
    _cancel_on_drop: DropGuard,
}

impl DownloadBatch {
    /// Wait for the next event; `None` once the batch is finished.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    /// Drain the batch.
    pub async fn collect_all(mut self) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}

impl Stream for DownloadBatch {
    type Item = DownloadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

/// Walk the queue in order, starting a transfer whenever a slot frees up.
async fn dispatch<T: Transport + 'static>(
    transport: Arc<T>,
    requests: Vec<DownloadRequest>,
    max_concurrent: usize,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<DownloadEvent>,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut queue = requests.into_iter();

    while let Some(request) = queue.next() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            debug!("Batch cancelled, dropping queued requests");
            for request in std::iter::once(request).chain(queue.by_ref()) {
                let _ = events.send(DownloadEvent::Cancelled {
                    package: request.package,
                });
            }
            break;
        };

        let transport = Arc::clone(&transport);
        let cancel = cancel.clone();
        let events = events.clone();

        tokio::spawn(async move {
            let package = request.package.clone();
            let event = AssertUnwindSafe(transfer(transport.as_ref(), request, &cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!("Download of {} {} panicked", package.id, package.version);
                    let error = anyhow::anyhow!("Download task for {} panicked", package.id);
                    DownloadEvent::Failed { package, error }
                });
            // Free the slot before reporting so the next transfer can start
            drop(permit);
            let _ = events.send(event);
        });
    }
}

async fn transfer<T: Transport>(
    transport: &T,
    request: DownloadRequest,
    cancel: &CancellationToken,
) -> DownloadEvent {
    let DownloadRequest {
        package,
        destination,
        progress,
    } = request;

    if cancel.is_cancelled() {
        return DownloadEvent::Cancelled { package };
    }

    let Some(url) = package.installer.as_ref().map(|i| i.url.clone()) else {
        let error = anyhow::anyhow!("Package {} has no installer", package.id);
        return DownloadEvent::Failed { package, error };
    };

    info!("Downloading {} {} from {}", package.id, package.version, url);

    match transport
        .fetch(&url, &destination, progress, cancel.clone())
        .await
    {
        Ok(bytes) => {
            info!(
                "Downloaded {} {} ({} bytes) to {:?}",
                package.id, package.version, bytes, destination
            );
            DownloadEvent::Completed(DownloadResult {
                package,
                path: destination,
            })
        }
        Err(e) if is_cancelled(&e) || cancel.is_cancelled() => {
            debug!("Download of {} cancelled", package.id);
            DownloadEvent::Cancelled { package }
        }
        Err(error) => {
            warn!("Download of {} {} failed: {:#}", package.id, package.version, error);
            DownloadEvent::Failed { package, error }
        }
    }
}
