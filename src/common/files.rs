//! 下载目录中文件的删除

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error, info};

/// 删除文件；文件已不存在时返回 `Ok(false)`
pub async fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

async fn remove_logged(path: &Path) {
    match remove_if_present(path).await {
        Ok(true) => info!("已删除: {}", path.display()),
        Ok(false) => debug!("文件已不存在: {}", path.display()),
        Err(e) => error!("删除文件失败 {}: {}", path.display(), e),
    }
}

/// 在 `delay` 之后删除文件
///
/// 有 tokio 运行时时在后台任务中删除，否则立即同步删除。
pub fn schedule_removal(path: PathBuf, delay: Duration) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                remove_logged(&path).await;
            });
        }
        Err(_) => match std::fs::remove_file(&path) {
            Ok(()) => info!("已删除: {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!("删除文件失败 {}: {}", path.display(), e),
        },
    }
}
