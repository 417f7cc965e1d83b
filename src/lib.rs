pub mod commands;
pub mod download;
pub mod http;
pub mod package;
pub mod runtime;
pub mod store;
