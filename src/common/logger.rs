use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use colored::{ColoredString, Colorize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化 tracing 日志
///
/// 控制台输出始终开启；指定 `log_file` 时额外以无颜色格式追加写入该文件。
/// 日志级别默认为 `info`，可通过 `RUST_LOG` 覆盖。
pub fn init_tracing(log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}

const BANNER_WIDTH: usize = 48;

/// 启动横幅的控制台输出
pub struct Banner;

impl Banner {
    fn line(icon: ColoredString, text: impl AsRef<str>) {
        println!("{} {}", icon, text.as_ref());
    }

    pub fn heading(text: &str) {
        let width = text.chars().count().min(BANNER_WIDTH);
        let left = (BANNER_WIDTH - width) / 2;
        let right = BANNER_WIDTH - left - width;
        println!(
            "{} {} {}",
            "═".repeat(left).cyan(),
            text.bold(),
            "═".repeat(right).cyan()
        );
    }

    pub fn ok(text: impl AsRef<str>) {
        Self::line("✓".green().bold(), text);
    }

    pub fn note(text: impl AsRef<str>) {
        Self::line("•".blue().bold(), text);
    }

    pub fn warn(text: impl AsRef<str>) {
        Self::line("!".yellow().bold(), text.as_ref().yellow().to_string());
    }

    /// `label: value`，标签加粗
    pub fn field(label: &str, value: impl AsRef<str>) {
        Self::line("•".blue().bold(), format!("{}: {}", label.bold(), value.as_ref()));
    }

    /// 外部工具的探测结果
    pub fn tool(name: &str, version: Option<&str>) {
        match version {
            Some(v) => Self::ok(format!("{} {}", name.bold(), v.green())),
            None => Self::warn(format!("{} not found", name)),
        }
    }

    pub fn rule() {
        println!("{}", "═".repeat(BANNER_WIDTH + 2).cyan());
    }
}
