/// 按字符截断，避免切断多字节字符
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// 从 URL 的最后一段路径推测一个临时标题
pub fn title_from_url(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    truncate_chars(last, 50)
}

/// 把字节数格式化成 MB 显示
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}
