use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::task::TaskUpdate;

lazy_static! {
    static ref PERCENT: Regex = Regex::new(r"(\d+(?:\.\d+)?)%").unwrap();
    static ref SPEED: Regex = Regex::new(r"\bat\s+~?\s*([\d.]+\s*[A-Za-z]+/s)").unwrap();
    static ref ETA: Regex = Regex::new(r"\bETA\s+(\S+)").unwrap();
}

const PROGRESS_MARKER: &str = "[download]";

/// 从一行 yt-dlp 输出中解析出的进度
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub percent: f64,
    pub speed: String,
    pub eta: String,
}

impl From<ProgressLine> for TaskUpdate {
    fn from(line: ProgressLine) -> Self {
        TaskUpdate::progress(line.percent, line.speed, line.eta)
    }
}

/// 解析进度行
///
/// 例: `[download]  45.2% of 10.00MiB at 1.2MiB/s ETA 00:20`
///
/// 只处理含 `[download]` 的行；百分比取第一个带 `%` 的数字，
/// 速度和剩余时间缺失时为 `"N/A"`。
pub fn parse_progress(line: &str) -> Option<ProgressLine> {
    if !line.contains(PROGRESS_MARKER) {
        return None;
    }

    let percent = PERCENT.captures(line)?.get(1)?.as_str().parse::<f64>().ok()?;

    let speed = SPEED
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let eta = ETA
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    Some(ProgressLine {
        percent,
        speed,
        eta,
    })
}

/// 单个任务的进度解析器，每跨过一个 10% 记录一次日志
pub struct ProgressParser {
    task_id: String,
    last_logged: u32,
}

impl ProgressParser {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            last_logged: 0,
        }
    }

    pub fn parse_line(&mut self, line: &str) -> Option<ProgressLine> {
        let progress = parse_progress(line)?;

        let decile = (progress.percent.clamp(0.0, 100.0) as u32) / 10 * 10;
        if decile > self.last_logged {
            info!(
                "任务 {}: {}% at {}",
                self.task_id, progress.percent, progress.speed
            );
            self.last_logged = decile;
        }

        Some(progress)
    }
}
