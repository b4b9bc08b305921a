use itertools::Itertools;
use serde::Serialize;

use crate::common::utils::truncate_chars;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Video,
    Audio,
    Unknown,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormatEntry {
    pub id: String,
    pub info: String,
    #[serde(rename = "type")]
    pub kind: FormatKind,
}

/// 解析 `--list-formats` 的表格输出
///
/// 以数字开头的行视为一个格式：第一列是格式ID，其余部分（最多100字符）是描述。
pub fn parse_formats(output: &str) -> Vec<FormatEntry> {
    output
        .lines()
        .filter(|line| line.starts_with(|c: char| c.is_ascii_digit()))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?;
            let info = parts.join(" ");
            if info.is_empty() {
                return None;
            }

            let lower = info.to_lowercase();
            let kind = if lower.contains("video") {
                FormatKind::Video
            } else if lower.contains("audio") {
                FormatKind::Audio
            } else {
                FormatKind::Unknown
            };

            Some(FormatEntry {
                id: id.to_string(),
                info: truncate_chars(&info, 100),
                kind,
            })
        })
        .collect()
}
