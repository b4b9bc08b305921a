//! yt-dlp 子进程的调用封装
//!
//! 所有调用都带上浏览器伪装参数和清理后的 referer，
//! 并设置 `kill_on_drop`，超时后被丢弃的进程会被杀掉。

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use super::error::DownloadError;
use crate::common::referer::origin_of;
use crate::config::ServerConfig;

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct YtDlp {
    bin: String,
    impersonate: String,
    concurrent_fragments: u32,
    browser_headers: bool,
}

impl YtDlp {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            impersonate: "chrome-120".to_string(),
            concurrent_fragments: 10,
            browser_headers: true,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bin: config.ytdlp_path.clone(),
            impersonate: config.impersonate.clone(),
            concurrent_fragments: config.concurrent_fragments,
            browser_headers: config.browser_headers,
        }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    fn base_command(&self, referer: &str) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--extractor-args")
            .arg(format!("generic:impersonate={}", self.impersonate))
            .arg("--referer")
            .arg(referer);

        if self.browser_headers {
            if let Some(origin) = origin_of(referer) {
                cmd.arg("--add-header").arg(format!("Origin:{}", origin));
            }
        }

        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// 构造下载命令，stdout 与 stderr 都以管道方式输出
    pub fn download_command(
        &self,
        url: &str,
        format_id: &str,
        referer: &str,
        output_template: &Path,
    ) -> Command {
        let mut cmd = self.base_command(referer);
        cmd.arg("--newline")
            .arg("--concurrent-fragments")
            .arg(self.concurrent_fragments.to_string())
            .arg("-o")
            .arg(output_template)
            .arg("-f")
            .arg(format_id)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// 以 `--list-formats` 模式运行，返回合并后的输出文本
    pub async fn list_formats(
        &self,
        url: &str,
        referer: &str,
        timeout: Duration,
    ) -> Result<String, DownloadError> {
        let mut cmd = self.base_command(referer);
        cmd.arg("--list-formats").arg(url);
        info!("运行: {:?}", cmd.as_std());

        let output = run_with_timeout(&mut cmd, timeout).await?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    /// 获取视频标题，任何失败都返回 None
    pub async fn fetch_title(&self, url: &str, referer: &str, timeout: Duration) -> Option<String> {
        let mut cmd = self.base_command(referer);
        cmd.arg("--get-title").arg(url);

        match run_with_timeout(&mut cmd, timeout).await {
            Ok(output) if output.status.success() => {
                let title = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!title.is_empty()).then_some(title)
            }
            Ok(output) => {
                debug!("获取标题失败, 退出码: {:?}", output.status.code());
                None
            }
            Err(e) => {
                debug!("获取标题失败: {}", e);
                None
            }
        }
    }
}

/// 运行 `<bin> --version`，返回第一行输出
pub async fn probe_version(bin: &str) -> Option<String> {
    let mut cmd = Command::new(bin);
    cmd.arg("--version").stdin(Stdio::null()).kill_on_drop(true);

    let output = run_with_timeout(&mut cmd, VERSION_TIMEOUT).await.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, DownloadError> {
    let bin = cmd.as_std().get_program().to_string_lossy().into_owned();
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(DownloadError::Spawn { bin, source }),
        Err(_) => Err(DownloadError::Timeout(timeout.as_secs())),
    }
}
