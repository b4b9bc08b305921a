use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::delivery;
use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::common::referer::clean_referer;
use crate::common::utils::{title_from_url, truncate_chars};
use crate::downloader::DownloadRequest;
use crate::downloader::formats::{FormatEntry, parse_formats};
use crate::task::{TaskSnapshot, TaskSummary};

#[derive(Debug, Default, Deserialize)]
pub struct FormatsBody {
    pub url: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadBody {
    pub url: Option<String>,
    pub format_id: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatEntry>,
    pub count: usize,
    pub title: String,
}

/// 空请求体按默认值处理，这样缺少 url 时返回的是校验错误
fn parse_body<T>(body: &Bytes) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(format!("Invalid JSON body: {}", e)))
}

fn required_url(url: Option<String>) -> ApiResult<String> {
    match url.map(|u| u.trim().to_string()) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(ApiError::Validation("URL is required".to_string())),
    }
}

/// GET /ping
pub async fn ping() -> Json<Value> {
    Json(json!({ "status": "pong" }))
}

/// GET /active
pub async fn active(State(state): State<AppState>) -> Json<Vec<TaskSummary>> {
    Json(state.registry.list_active())
}

/// POST /formats
pub async fn formats(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<FormatsResponse>> {
    let body: FormatsBody = parse_body(&body)?;
    let url = required_url(body.url)?;
    let referer = clean_referer(body.referer.as_deref(), &state.config.default_referer);

    info!("获取格式: {}", truncate_chars(&url, 100));
    info!("原始 referer: {:?}", body.referer);
    info!("清理后 referer: {}", referer);

    let output = state
        .ytdlp
        .list_formats(&url, &referer, state.config.formats_timeout)
        .await?;
    let formats = parse_formats(&output);

    let title = state
        .ytdlp
        .fetch_title(&url, &referer, state.config.title_timeout)
        .await
        .unwrap_or_else(|| title_from_url(&url));

    Ok(Json(FormatsResponse {
        count: formats.len(),
        formats,
        title,
    }))
}

/// POST /download
pub async fn download(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let body: DownloadBody = parse_body(&body)?;
    let url = required_url(body.url)?;
    let format_id = body
        .format_id
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| "best".to_string());
    let referer = clean_referer(body.referer.as_deref(), &state.config.default_referer);

    info!("下载: {}", truncate_chars(&url, 100));
    info!("格式: {}", format_id);
    info!("原始 referer: {:?}", body.referer);
    info!("清理后 referer: {}", referer);

    let task_id = state.manager.submit(DownloadRequest {
        url,
        format_id,
        referer,
    })?;

    Ok(Json(json!({ "task_id": task_id })))
}

/// GET /status/{task_id}
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskSnapshot>> {
    state
        .registry
        .get(&task_id)
        .map(Json)
        .ok_or(ApiError::TaskNotFound)
}

/// GET /file/{task_id}
pub async fn file(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Response> {
    let artifact = state.registry.consume_file(&task_id)?;
    delivery::serve_artifact(artifact, state.config.cleanup_delay).await
}

/// POST /cleanup
pub async fn cleanup(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let count = delivery::clear_directory(&state.config.download_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "message": format!("Cleaned up {} files", count),
        "count": count,
    })))
}
