pub mod cli;
pub mod common;
pub mod config;
pub mod downloader;
pub mod server;
pub mod task;

pub use config::ServerConfig;
pub use downloader::DownloadManager;
pub use task::TaskRegistry;
