use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info};

use super::error::DownloadError;
use super::worker::{DownloadJob, Worker};
use super::ytdlp::YtDlp;
use crate::common::utils::title_from_url;
use crate::config::ServerConfig;
use crate::task::{TaskId, TaskRegistry, TaskUpdate};

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: String,
    pub referer: String,
}

/// 下载任务的受监督启动器
///
/// `admission` 限制排队加运行中的任务总数，超出时直接拒绝；
/// `workers` 限制同时运行的 yt-dlp 进程数，超出的任务保持 `started` 等待。
#[derive(Clone)]
pub struct DownloadManager {
    registry: TaskRegistry,
    worker: Worker,
    admission: Arc<Semaphore>,
    workers: Arc<Semaphore>,
    max_pending: usize,
}

impl DownloadManager {
    pub fn new(registry: TaskRegistry, ytdlp: Arc<YtDlp>, config: &ServerConfig) -> Self {
        let worker = Worker::new(
            registry.clone(),
            ytdlp,
            config.download_dir.clone(),
            config.title_timeout,
        );
        Self {
            registry,
            worker,
            admission: Arc::new(Semaphore::new(config.max_pending_tasks)),
            workers: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
            max_pending: config.max_pending_tasks,
        }
    }

    /// 创建任务并在后台启动下载，立即返回任务ID
    pub fn submit(&self, request: DownloadRequest) -> Result<TaskId, DownloadError> {
        let admission = Arc::clone(&self.admission)
            .try_acquire_owned()
            .map_err(|_| DownloadError::TooManyTasks(self.max_pending))?;

        let task_id = self.registry.create(title_from_url(&request.url));
        info!("添加下载任务: {} ({})", task_id, request.format_id);

        let job = DownloadJob {
            task_id: task_id.clone(),
            url: request.url,
            format_id: request.format_id,
            referer: request.referer,
        };

        let manager = self.clone();
        tokio::spawn(async move {
            manager.supervise(job, admission).await;
        });

        Ok(task_id)
    }

    async fn supervise(self, job: DownloadJob, _admission: OwnedSemaphorePermit) {
        let task_id = job.task_id.clone();

        let _slot = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.registry
                    .update(task_id.as_str(), TaskUpdate::failed("下载队列已关闭"));
                return;
            }
        };

        // 单独的 task 里运行，panic 也不会让任务停在非终态
        let worker = self.worker.clone();
        let handle = tokio::spawn(async move { worker.run(job).await });
        if let Err(e) = handle.await {
            let err = DownloadError::WorkerPanicked(e.to_string());
            error!("任务 {}: {}", task_id, err);
            self.registry
                .update(task_id.as_str(), TaskUpdate::failed(err.to_string()));
        }
    }
}
