use anyhow::Context;
use clap::Parser;
use tracing::info;

use video_relay::cli::Cli;
use video_relay::common::logger::{Banner, init_tracing};
use video_relay::config::ServerConfig;
use video_relay::downloader::ytdlp::probe_version;
use video_relay::server::{self, AppState};

/// 打印启动信息并探测外部工具
async fn print_banner(config: &ServerConfig) {
    let download_dir = std::fs::canonicalize(&config.download_dir)
        .unwrap_or_else(|_| config.download_dir.clone());

    let ytdlp_version = probe_version(&config.ytdlp_path).await;
    let aria2_version = probe_version("aria2c").await;

    println!();
    Banner::heading("VIDEO DOWNLOAD SERVER");
    Banner::field("Download folder", download_dir.display().to_string());
    Banner::field("Server URL", config.local_url());
    Banner::tool("yt-dlp", ytdlp_version.as_deref());
    Banner::tool("aria2c", aria2_version.as_deref());
    Banner::field(
        "Workers",
        format!(
            "{} running / {} pending max",
            config.max_concurrent_downloads, config.max_pending_tasks
        ),
    );
    Banner::note("Referer auto-clean: enabled");
    Banner::rule();
    println!();

    if ytdlp_version.is_none() {
        Banner::warn(format!(
            "未找到 {}，下载请求将会失败。可通过 --ytdlp-path 或 YTDLP_PATH 指定路径",
            config.ytdlp_path
        ));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let args = Cli::parse();
    let config = ServerConfig::from(args);

    // 初始化日志
    init_tracing(config.log_file.as_deref()).context("初始化日志失败")?;

    // 创建输出目录
    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("创建下载目录失败: {:?}", config.download_dir))?;
    info!("下载目录: {:?}", config.download_dir);

    print_banner(&config).await;

    let state = AppState::new(config);
    let _sweeper = state.registry.spawn_sweeper(state.config.sweep_interval);

    server::serve(state).await
}
