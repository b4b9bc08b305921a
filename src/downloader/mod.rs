pub mod error;
pub mod formats;
pub mod manager;
pub mod progress;
pub mod worker;
pub mod ytdlp;

pub use error::DownloadError;
pub use manager::{DownloadManager, DownloadRequest};
pub use worker::{DownloadJob, Worker};
pub use ytdlp::YtDlp;
