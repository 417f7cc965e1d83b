use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    download::Downloader,
    http::{HttpClient, HttpTransport},
    package::PackageService,
    runtime::Runtime,
    store::FileStore,
};

/// Transfers started at once when no limit is given.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Config<R: Runtime> {
    pub runtime: Arc<R>,
    pub client: Client,
    pub store_root: PathBuf,
    pub scratch_dir: PathBuf,
    pub max_concurrent: usize,
}

impl<R: Runtime + 'static> Config<R> {
    pub fn new(
        runtime: R,
        store_root: Option<PathBuf>,
        scratch_dir: Option<PathBuf>,
        max_concurrent: Option<usize>,
    ) -> Result<Self> {
        let store_root = match store_root {
            Some(root) => root,
            None => runtime
                .config_dir()
                .map(|dir| dir.join("bahkat").join("store"))
                .context("No configuration directory found; pass --root")?,
        };
        let scratch_dir = scratch_dir.unwrap_or_else(|| runtime.temp_dir());
        let max_concurrent = max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT).max(1);

        debug!(
            "Store root {:?}, scratch dir {:?}, {} concurrent downloads",
            store_root, scratch_dir, max_concurrent
        );

        let client = Client::builder()
            .user_agent("bahkat-cli")
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            runtime: Arc::new(runtime),
            client,
            store_root,
            scratch_dir,
            max_concurrent,
        })
    }

    pub fn package_service(&self) -> PackageService<FileStore<R>> {
        PackageService::new(FileStore::new(
            Arc::clone(&self.runtime),
            self.store_root.clone(),
        ))
    }

    pub fn downloader(&self) -> Downloader<HttpTransport<R>> {
        let transport = HttpTransport::new(
            HttpClient::new(self.client.clone()),
            Arc::clone(&self.runtime),
        );
        Downloader::new(Arc::new(transport))
    }
}
