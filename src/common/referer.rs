use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    // 不在 ':' 之后的连续斜杠
    static ref REPEATED_SLASHES: Regex = Regex::new(r"(^|[^:])/{2,}").unwrap();
}

/// 清理 referer 中的重复片段并规范格式
///
/// 这只是尽力而为的文本修正，不是严格的 URL 校验：
/// - 空值返回 `default`
/// - 出现多个 `//` 时（如 `https://aniv//anivox.fun/`）取最后一段的域名
/// - 非协议位置的连续斜杠合并为一个
/// - 结尾补 `/`，缺少协议时补 `https://`
pub fn clean_referer(referer: Option<&str>, default: &str) -> String {
    let referer = match referer.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return default.to_string(),
    };

    let mut cleaned = referer.to_string();

    let parts: Vec<&str> = referer.split("//").collect();
    if parts.len() > 2 {
        let domain = parts[parts.len() - 1].split('/').next().unwrap_or_default();
        cleaned = format!("{}//{}/", parts[0], domain);
    }

    cleaned = REPEATED_SLASHES.replace_all(&cleaned, "${1}/").into_owned();

    if !cleaned.ends_with('/') {
        cleaned.push('/');
    }

    if !cleaned.starts_with("http") {
        cleaned = format!("https://{}", cleaned.trim_start_matches('/'));
    }

    cleaned
}

/// 由 referer 推导 `Origin` 头的值（`scheme://host[:port]`）
pub fn origin_of(referer: &str) -> Option<String> {
    let origin = Url::parse(referer).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
