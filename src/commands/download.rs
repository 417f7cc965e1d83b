use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    download::{DownloadEvent, DownloadProgress, DownloadRequest, Downloader},
    http::Transport,
    package::Package,
    runtime::Runtime,
};

use super::config::Config;

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub scratch_dir: Option<PathBuf>,
    pub max_concurrent: Option<usize>,
    pub only_updates: bool,
}

/// Download the installers of the packages listed in `packages_path`.
#[tracing::instrument(skip(runtime, store_root, options))]
pub async fn download<R: Runtime + 'static>(
    runtime: R,
    packages_path: &Path,
    store_root: Option<PathBuf>,
    options: DownloadOptions,
) -> Result<()> {
    let config = Config::new(
        runtime,
        store_root,
        options.scratch_dir,
        options.max_concurrent,
    )?;
    let mut packages = Package::load_all(config.runtime.as_ref(), packages_path)?;

    if options.only_updates {
        let service = config.package_service();
        let updates: Vec<Package> = service
            .updates_available(&packages)?
            .into_iter()
            .cloned()
            .collect();
        packages = updates;
    }

    let (wanted, skipped): (Vec<_>, Vec<_>) =
        packages.into_iter().partition(|p| p.installer.is_some());
    for package in &skipped {
        warn!("{} {} has no installer, skipping", package.id, package.version);
    }

    if wanted.is_empty() {
        println!("Nothing to download.");
        return Ok(());
    }

    let mut summary = BatchSummary::default();
    let mut requests = Vec::with_capacity(wanted.len());
    for package in wanted {
        let label = format!("{} {}", package.id, package.version);
        match DownloadRequest::for_package(package, &config.scratch_dir) {
            Ok(request) => requests.push(request),
            Err(e) => {
                eprintln!("   failed {}: {:#}", label, e);
                summary.failed += 1;
            }
        }
    }

    if !requests.is_empty() {
        config
            .runtime
            .create_dir_all(&config.scratch_dir)
            .with_context(|| {
                format!("Failed to create download directory {:?}", config.scratch_dir)
            })?;
        summary += run(&config.downloader(), requests, config.max_concurrent).await;
    }

    summary.into_result()
}

/// Terminal outcomes of one download command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    /// Error out if anything was not downloaded.
    pub fn into_result(self) -> Result<()> {
        if self.cancelled > 0 {
            anyhow::bail!(
                "Download cancelled, {} package(s) not downloaded",
                self.cancelled
            );
        }
        if self.failed > 0 {
            anyhow::bail!("{} download(s) failed", self.failed);
        }
        Ok(())
    }
}

impl std::ops::AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.cancelled += other.cancelled;
    }
}

/// Run one batch to completion, printing each outcome. Ctrl-C cancels the
/// batch instead of killing the process so partial files get removed.
pub async fn run<T: Transport + 'static>(
    downloader: &Downloader<T>,
    requests: Vec<DownloadRequest>,
    max_concurrent: usize,
) -> BatchSummary {
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    let ctrl_c_handler = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling downloads...");
            cancel_on_signal.cancel();
        }
    });

    let requests = requests.into_iter().map(with_progress_log).collect();
    let summary = report(downloader, requests, max_concurrent, cancel).await;

    ctrl_c_handler.abort();
    summary
}

pub(crate) async fn report<T: Transport + 'static>(
    downloader: &Downloader<T>,
    requests: Vec<DownloadRequest>,
    max_concurrent: usize,
    cancel: CancellationToken,
) -> BatchSummary {
    let mut batch = downloader.download(requests, max_concurrent, cancel);
    let mut summary = BatchSummary::default();

    while let Some(event) = batch.next_event().await {
        match event {
            DownloadEvent::Completed(result) => {
                println!(
                    "   downloaded {} {} to {}",
                    result.package.id,
                    result.package.version,
                    result.path.display()
                );
                summary.completed += 1;
            }
            DownloadEvent::Failed { package, error } => {
                eprintln!("   failed {} {}: {:#}", package.id, package.version, error);
                summary.failed += 1;
            }
            DownloadEvent::Cancelled { package } => {
                debug!("{} {} cancelled", package.id, package.version);
                summary.cancelled += 1;
            }
        }
    }
    summary
}

fn with_progress_log(request: DownloadRequest) -> DownloadRequest {
    let (tx, mut rx) = mpsc::unbounded_channel::<DownloadProgress>();
    let id = request.package.id.clone();
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            match progress.total_bytes {
                Some(total) => debug!("{}: {}/{} bytes", id, progress.bytes_received, total),
                None => debug!("{}: {} bytes", id, progress.bytes_received),
            }
        }
    });
    request.with_progress(tx)
}
