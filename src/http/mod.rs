//! HTTP transfers with cancellation and error classification.

mod client;
mod error;
mod transport;

pub use client::HttpClient;
pub use error::{HttpStatusError, TransferCancelled, check_status, is_cancelled};
pub use transport::{DownloadProgress, HttpTransport, ProgressSink, Transport};

#[cfg(test)]
pub use transport::MockTransport;
