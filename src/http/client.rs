//! HTTP client for installer downloads.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::io::Write;
use tokio_util::sync::CancellationToken;

use super::error::{TransferCancelled, check_status};

/// HTTP client performing single-attempt, cancellable downloads.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Downloads a file from a URL, streaming it into the writer returned by
    /// `create_writer`. The writer is only created once the server answered
    /// with a success status.
    ///
    /// `on_progress` receives the bytes received so far and the total size
    /// if the server announced one. When `cancel` fires the request is
    /// dropped, which aborts the connection, and the call fails with
    /// [`TransferCancelled`].
    #[tracing::instrument(skip(self, create_writer, on_progress, cancel))]
    pub async fn download_file<W, F, P>(
        &self,
        url: &str,
        create_writer: F,
        mut on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
        P: FnMut(u64, Option<u64>),
    {
        debug!("Downloading file from {}...", url);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferCancelled.into()),
            response = self.client.get(url).send() => {
                response.context("Failed to start download request")?
            }
        };

        let mut response = check_status(response)?;
        let total_bytes = response.content_length();

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;
        on_progress(downloaded_bytes, total_bytes);

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferCancelled.into()),
                chunk = response.chunk() => {
                    chunk.context("Failed to read chunk from download stream")?
                }
            };
            let Some(chunk) = chunk else {
                break;
            };

            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
            on_progress(downloaded_bytes, total_bytes);
        }

        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpStatusError, is_cancelled};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_download_file_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.txt")
            .with_status(200)
            .with_body("test content")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let bytes = client
            .download_file(
                &format!("{}/file.txt", url),
                || Ok(std::io::sink()),
                |_, _| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 12); // "test content" is 12 bytes
    }

    #[tokio::test]
    async fn test_download_file_reports_progress() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/file.bin")
            .with_status(200)
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let client = HttpClient::new(Client::new());
        client
            .download_file(
                &format!("{}/file.bin", url),
                || Ok(std::io::sink()),
                move |received, total| seen_clone.lock().unwrap().push((received, total)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first().map(|p| p.0), Some(0));
        assert_eq!(seen.last().map(|p| p.0), Some(4096));
        // progress is monotonic
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[tokio::test]
    async fn test_download_file_writes_content() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/file.txt")
            .with_status(200)
            .with_body("payload")
            .create_async()
            .await;

        let buffer = Arc::new(Mutex::new(Vec::new()));

        struct SharedWriter(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let client = HttpClient::new(Client::new());
        let writer_buffer = Arc::clone(&buffer);
        client
            .download_file(
                &format!("{}/file.txt", url),
                move || Ok(SharedWriter(writer_buffer)),
                |_, _| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(buffer.lock().unwrap().as_slice(), b"payload");
    }

    #[tokio::test]
    async fn test_download_file_not_found_skips_writer() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.txt")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(
                &format!("{}/file.txt", url),
                || -> Result<std::io::Sink> { panic!("writer must not be created") },
                |_, _| {},
                &CancellationToken::new(),
            )
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<HttpStatusError>(),
            Some(&HttpStatusError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_download_file_rejects_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.txt")
            .with_status(304)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(
                &format!("{}/file.txt", url),
                || -> Result<std::io::Sink> { panic!("writer must not be created") },
                |_, _| {},
                &CancellationToken::new(),
            )
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<HttpStatusError>(),
            Some(&HttpStatusError::Unexpected(304))
        );
    }

    #[tokio::test]
    async fn test_download_file_single_attempt() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.txt")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(
                &format!("{}/file.txt", url),
                || Ok(std::io::sink()),
                |_, _| {},
                &CancellationToken::new(),
            )
            .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_download_file_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(
                "http://127.0.0.1:9/never",
                || Ok(std::io::sink()),
                |_, _| {},
                &cancel,
            )
            .await;

        assert!(is_cancelled(&result.unwrap_err()));
    }

    #[tokio::test]
    async fn test_download_file_connection_error() {
        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(
                "http://127.0.0.1:1/unreachable",
                || Ok(std::io::sink()),
                |_, _| {},
                &CancellationToken::new(),
            )
            .await;

        let err = result.unwrap_err();
        assert!(!is_cancelled(&err));
    }
}
