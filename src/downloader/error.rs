use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("无法启动 yt-dlp ({bin}): {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("yt-dlp exited with code {code}{}", excerpt_suffix(.output))]
    ExitCode { code: i32, output: String },

    #[error("yt-dlp terminated by signal{}", excerpt_suffix(.output))]
    Terminated { output: String },

    #[error("File not found after download")]
    ArtifactMissing,

    #[error("yt-dlp 超时 ({0}s)")]
    Timeout(u64),

    #[error("无法获取 yt-dlp 的{0}输出")]
    MissingPipe(&'static str),

    #[error("worker 异常退出: {0}")]
    WorkerPanicked(String),

    #[error("当前下载任务过多 (上限 {0})")]
    TooManyTasks(usize),
}

fn excerpt_suffix(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(": {}", output)
    }
}

impl DownloadError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DownloadError::Timeout(_))
    }
}
