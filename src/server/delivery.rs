//! 产物交付：文件只发送一次，发送结束后（无论成功与否）删除

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use crate::common::files::{remove_if_present, schedule_removal};
use crate::task::Artifact;

/// 持有待删除的文件，Drop 时在延迟后删除
pub struct ArtifactGuard {
    path: PathBuf,
    delay: Duration,
}

impl ArtifactGuard {
    pub fn new(path: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            path: path.into(),
            delay,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        schedule_removal(std::mem::take(&mut self.path), self.delay);
    }
}

/// 响应体流，流被丢弃时（发送完成或客户端断开）释放 guard
struct GuardedStream<S> {
    inner: S,
    _guard: ArtifactGuard,
}

impl<S> Stream for GuardedStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// 把已取出的产物作为附件发送，之后删除文件
pub async fn serve_artifact(artifact: Artifact, cleanup_delay: Duration) -> ApiResult<Response> {
    // guard 先于打开文件创建，打开失败时同样会删除
    let guard = ArtifactGuard::new(artifact.path.clone(), cleanup_delay);

    let file = match File::open(guard.path()).await {
        Ok(file) => file,
        Err(e) => {
            warn!("打开文件失败 {}: {}", artifact.path.display(), e);
            return Err(ApiError::FileNotReady);
        }
    };
    let size = match file.metadata().await {
        Ok(metadata) => metadata.len(),
        Err(_) => artifact.size,
    };

    let file_name = artifact.file_name();
    info!("发送文件: {}", file_name);

    let stream = GuardedStream {
        inner: ReaderStream::new(file),
        _guard: guard,
    };

    let headers = [
        (CONTENT_TYPE, content_type_for(&artifact.path).to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
        (CONTENT_LENGTH, size.to_string()),
    ];

    Ok((headers, Body::from_stream(stream)).into_response())
}

/// 删除目录中所有普通文件，返回删除数量
pub async fn clear_directory(dir: &Path) -> std::io::Result<usize> {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        // yt-dlp 或待执行的删除可能已先一步移除该文件
        if remove_if_present(&entry.path()).await? {
            info!("已清理: {}", entry.file_name().to_string_lossy());
            count += 1;
        } else {
            debug!("跳过已删除的文件: {}", entry.file_name().to_string_lossy());
        }
    }
    Ok(count)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "opus" | "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}
