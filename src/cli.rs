use clap::Parser;
use std::path::PathBuf;

/// yt-dlp 下载中转服务
#[derive(Parser, Debug, Clone)]
#[command(name = "vrelay")]
#[command(version = "1.0")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "基于 yt-dlp 的本地视频下载中转服务", long_about = None)]
pub struct Cli {
    /// 监听地址
    #[arg(long, env = "VRELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// 监听端口
    #[arg(long, env = "VRELAY_PORT", default_value_t = 5000)]
    pub port: u16,

    /// 下载文件保存目录
    #[arg(long, value_name = "DIR", env = "VRELAY_DOWNLOAD_DIR")]
    #[arg(default_value = "downloads")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub download_dir: PathBuf,

    /// yt-dlp 可执行文件路径
    #[arg(long, value_name = "PATH", env = "YTDLP_PATH", default_value = "yt-dlp")]
    #[arg(value_hint = clap::ValueHint::ExecutablePath)]
    pub ytdlp_path: String,

    /// 传给 generic 提取器的浏览器伪装配置
    #[arg(long, value_name = "PROFILE", default_value = "chrome-120")]
    pub impersonate: String,

    /// 请求未携带 referer 时使用的默认值
    #[arg(long, value_name = "URL", default_value = "https://megacloud.blog/")]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub default_referer: String,

    /// yt-dlp 分片并发数
    #[arg(long, default_value_t = 10)]
    pub concurrent_fragments: u32,

    /// 同时运行的 yt-dlp 进程上限
    #[arg(long, value_name = "并发数", default_value_t = 4)]
    pub max_concurrent_downloads: usize,

    /// 排队加运行中的任务上限，超出后直接拒绝
    #[arg(long, default_value_t = 32)]
    pub max_pending_tasks: usize,

    /// 已完成任务在列表中保留的秒数
    #[arg(long, default_value_t = 300)]
    pub retention_secs: u64,

    /// 获取格式列表的超时秒数
    #[arg(long, default_value_t = 30)]
    pub formats_timeout_secs: u64,

    /// 获取标题的超时秒数
    #[arg(long, default_value_t = 10)]
    pub title_timeout_secs: u64,

    /// 文件发送结束后延迟删除的秒数
    #[arg(long, default_value_t = 2)]
    pub cleanup_delay_secs: u64,

    /// 后台清理过期任务的间隔秒数
    #[arg(long, default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// 不附加由 referer 推导出的浏览器请求头
    #[arg(long)]
    pub no_browser_headers: bool,

    /// 额外写入的日志文件
    #[arg(long, value_name = "FILE", env = "VRELAY_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}
