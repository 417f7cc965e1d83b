pub mod config;
mod download;
mod skip;
mod status;

pub use download::{DownloadOptions, download};
pub use skip::skip;
pub use status::status;
