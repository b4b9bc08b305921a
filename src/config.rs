use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// 服务运行配置
///
/// 由命令行参数（及其环境变量回退）构造。测试中可以直接使用
/// [`ServerConfig::default`] 再按需覆盖字段。
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub download_dir: PathBuf,
    pub ytdlp_path: String,
    pub impersonate: String,
    pub default_referer: String,
    pub concurrent_fragments: u32,
    pub browser_headers: bool,
    pub max_concurrent_downloads: usize,
    pub max_pending_tasks: usize,
    pub retention: Duration,
    pub formats_timeout: Duration,
    pub title_timeout: Duration,
    pub cleanup_delay: Duration,
    pub sweep_interval: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            download_dir: PathBuf::from("downloads"),
            ytdlp_path: "yt-dlp".to_string(),
            impersonate: "chrome-120".to_string(),
            default_referer: "https://megacloud.blog/".to_string(),
            concurrent_fragments: 10,
            browser_headers: true,
            max_concurrent_downloads: 4,
            max_pending_tasks: 32,
            retention: Duration::from_secs(5 * 60),
            formats_timeout: Duration::from_secs(30),
            title_timeout: Duration::from_secs(10),
            cleanup_delay: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(60),
            log_file: None,
        }
    }
}

impl From<Cli> for ServerConfig {
    fn from(args: Cli) -> Self {
        Self {
            host: args.host,
            port: args.port,
            download_dir: args.download_dir,
            ytdlp_path: args.ytdlp_path,
            impersonate: args.impersonate,
            default_referer: args.default_referer,
            concurrent_fragments: args.concurrent_fragments,
            browser_headers: !args.no_browser_headers,
            // 0 会让所有任务永远排队
            max_concurrent_downloads: args.max_concurrent_downloads.max(1),
            max_pending_tasks: args.max_pending_tasks.max(1),
            retention: Duration::from_secs(args.retention_secs),
            formats_timeout: Duration::from_secs(args.formats_timeout_secs),
            title_timeout: Duration::from_secs(args.title_timeout_secs),
            cleanup_delay: Duration::from_secs(args.cleanup_delay_secs),
            sweep_interval: Duration::from_secs(args.sweep_interval_secs.max(1)),
            log_file: args.log_file,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 便于日志展示的本地访问地址
    pub fn local_url(&self) -> String {
        let host = if self.host == "0.0.0.0" {
            "localhost"
        } else {
            self.host.as_str()
        };
        format!("http://{}:{}", host, self.port)
    }
}
