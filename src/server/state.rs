use std::sync::Arc;

use crate::config::ServerConfig;
use crate::downloader::{DownloadManager, YtDlp};
use crate::task::TaskRegistry;

/// 所有处理函数共享的状态
#[derive(Clone)]
pub struct AppState {
    pub registry: TaskRegistry,
    pub manager: DownloadManager,
    pub ytdlp: Arc<YtDlp>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = TaskRegistry::new(config.retention);
        let ytdlp = Arc::new(YtDlp::from_config(&config));
        let manager = DownloadManager::new(registry.clone(), Arc::clone(&ytdlp), &config);

        Self {
            registry,
            manager,
            ytdlp,
            config: Arc::new(config),
        }
    }
}
