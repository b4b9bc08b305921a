use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::DownloadError;
use super::progress::ProgressParser;
use super::ytdlp::YtDlp;
use crate::common::utils::{format_megabytes, truncate_chars};
use crate::task::{Artifact, TaskId, TaskRegistry, TaskUpdate};

const LINE_BUFFER: usize = 256;
const TAIL_LINES: usize = 5;
const TAIL_MAX_CHARS: usize = 500;

/// 一次下载所需的全部输入
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub task_id: TaskId,
    pub url: String,
    pub format_id: String,
    pub referer: String,
}

/// 驱动单个 yt-dlp 进程并把它的输出翻译成任务状态
#[derive(Clone)]
pub struct Worker {
    registry: TaskRegistry,
    ytdlp: Arc<YtDlp>,
    output_dir: PathBuf,
    title_timeout: Duration,
}

impl Worker {
    pub fn new(
        registry: TaskRegistry,
        ytdlp: Arc<YtDlp>,
        output_dir: impl Into<PathBuf>,
        title_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ytdlp,
            output_dir: output_dir.into(),
            title_timeout,
        }
    }

    /// 运行到任务进入终态为止，错误都记录在任务上，不向外传播
    pub async fn run(&self, job: DownloadJob) {
        let task_id = job.task_id.as_str();

        if let Some(title) = self
            .ytdlp
            .fetch_title(&job.url, &job.referer, self.title_timeout)
            .await
        {
            debug!("任务 {}: 标题 {}", task_id, title);
            self.registry.update(task_id, TaskUpdate::title(title));
        }

        let update = match self.download(&job).await {
            Ok(artifact) => {
                info!(
                    "任务 {}: 下载完成 - {}",
                    task_id,
                    format_megabytes(artifact.size)
                );
                TaskUpdate::completed(artifact)
            }
            Err(e) => {
                error!("任务 {}: 下载失败 - {}", task_id, e);
                TaskUpdate::failed(e.to_string())
            }
        };

        self.registry.update(task_id, update);
    }

    async fn download(&self, job: &DownloadJob) -> Result<Artifact, DownloadError> {
        let task_id = job.task_id.as_str();
        let template = self.output_dir.join(format!("{}.%(ext)s", task_id));

        let mut cmd = self
            .ytdlp
            .download_command(&job.url, &job.format_id, &job.referer, &template);
        info!("任务 {}: 运行 {:?}", task_id, cmd.as_std());

        let mut child = cmd.spawn().map_err(|source| DownloadError::Spawn {
            bin: self.ytdlp.bin().to_string(),
            source,
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(DownloadError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(DownloadError::MissingPipe("stderr"))?;

        // stdout 和 stderr 合并成一条行流
        let (tx, mut rx) = mpsc::channel::<String>(LINE_BUFFER);
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        let mut parser = ProgressParser::new(task_id);
        let mut tail = OutputTail::new(TAIL_LINES);
        let mut seen_output = false;

        while let Some(line) = rx.recv().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if !seen_output {
                seen_output = true;
                self.registry.update(task_id, TaskUpdate::downloading());
            }

            if let Some(progress) = parser.parse_line(line) {
                self.registry.update(task_id, progress.into());
            }

            debug!("任务 {}: {}", task_id, line);
            tail.push(line);
        }

        let status = child.wait().await?;
        match status.code() {
            Some(0) => {}
            Some(code) => {
                return Err(DownloadError::ExitCode {
                    code,
                    output: tail.excerpt(),
                });
            }
            None => {
                return Err(DownloadError::Terminated {
                    output: tail.excerpt(),
                });
            }
        }

        find_artifact(&self.output_dir, task_id)
            .await?
            .ok_or(DownloadError::ArtifactMissing)
    }
}

/// 在输出目录中查找以任务ID开头的文件，忽略未完成的临时文件
pub async fn find_artifact(dir: &Path, task_id: &str) -> Result<Option<Artifact>, DownloadError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if !name.starts_with(task_id) || name.ends_with(".part") || name.ends_with(".ytdl") {
            continue;
        }

        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            return Ok(Some(Artifact {
                path: entry.path(),
                size: metadata.len(),
            }));
        }
    }
    Ok(None)
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf).into_owned();
                // 进度条可能只用 \r 刷新
                for segment in text.split('\r') {
                    if tx.send(segment.to_string()).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("读取 yt-dlp 输出失败: {}", e);
                break;
            }
        }
    }
}

/// 最近几行输出，用于错误信息
struct OutputTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    fn excerpt(&self) -> String {
        truncate_chars(&self.lines.iter().join(" | "), TAIL_MAX_CHARS)
    }
}
