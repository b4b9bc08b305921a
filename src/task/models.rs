use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务ID，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// --------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Started,
    Downloading,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Started => "started",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 下载产物，在被取走之前归任务独占
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// 任务状态及其附带数据
///
/// 产物只存在于 `Completed`，错误信息只存在于 `Error`，
/// 因此读者不可能看到缺少产物的已完成任务。
#[derive(Debug, Clone)]
pub enum TaskState {
    Started,
    Downloading,
    Completed {
        artifact: Artifact,
        completed_at: DateTime<Utc>,
    },
    Error {
        message: String,
        completed_at: DateTime<Utc>,
    },
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Started => TaskStatus::Started,
            TaskState::Downloading => TaskStatus::Downloading,
            TaskState::Completed { .. } => TaskStatus::Completed,
            TaskState::Error { .. } => TaskStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TaskState::Completed { completed_at, .. } | TaskState::Error { completed_at, .. } => {
                Some(*completed_at)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub created_at: DateTime<Utc>,
    pub state: TaskState,
}

impl Task {
    pub fn new(id: TaskId, title: String) -> Self {
        Self {
            id,
            title,
            progress: 0.0,
            speed: "N/A".to_string(),
            eta: "N/A".to_string(),
            created_at: Utc::now(),
            state: TaskState::Started,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// 合并部分字段，任务已结束时忽略并返回 false
    pub fn apply(&mut self, update: TaskUpdate) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(eta) = update.eta {
            self.eta = eta;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(state) = update.state {
            self.state = state;
        }
        true
    }

    /// 已结束且超过保留时间
    pub fn is_expired(&self, now: DateTime<Utc>, retention: TimeDelta) -> bool {
        self.state
            .completed_at()
            .is_some_and(|done| now.signed_duration_since(done) >= retention)
    }

    /// 尚未取走的产物路径
    pub fn artifact_path(&self) -> Option<PathBuf> {
        match &self.state {
            TaskState::Completed { artifact, .. } => Some(artifact.path.clone()),
            _ => None,
        }
    }

    pub fn into_artifact(self) -> Option<Artifact> {
        match self.state {
            TaskState::Completed { artifact, .. } => Some(artifact),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let (size, error) = match &self.state {
            TaskState::Completed { artifact, .. } => (Some(artifact.size), None),
            TaskState::Error { message, .. } => (None, Some(message.clone())),
            _ => (None, None),
        };

        TaskSnapshot {
            task_id: self.id.clone(),
            status: self.status(),
            progress: self.progress,
            speed: self.speed.clone(),
            eta: self.eta.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            completed_at: self.state.completed_at(),
            size,
            error,
        }
    }

    /// 活跃列表中的条目；出错的任务不出现在列表里
    pub fn summary(&self) -> Option<TaskSummary> {
        let (progress, speed, eta) = match self.state {
            TaskState::Started | TaskState::Downloading => {
                (self.progress, self.speed.clone(), self.eta.clone())
            }
            TaskState::Completed { .. } => (100.0, "Complete".to_string(), "Done".to_string()),
            TaskState::Error { .. } => return None,
        };

        Some(TaskSummary {
            task_id: self.id.clone(),
            title: self.title.clone(),
            progress,
            speed,
            eta,
            status: self.status(),
            created_at: self.created_at,
        })
    }
}

/// 状态查询返回的只读快照，不包含文件路径
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub title: String,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub status: TaskStatus,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// 对任务的部分更新
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub progress: Option<f64>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub title: Option<String>,
    pub state: Option<TaskState>,
}

impl TaskUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn downloading() -> Self {
        Self {
            state: Some(TaskState::Downloading),
            ..Default::default()
        }
    }

    pub fn progress(percent: f64, speed: impl Into<String>, eta: impl Into<String>) -> Self {
        Self {
            progress: Some(percent),
            speed: Some(speed.into()),
            eta: Some(eta.into()),
            state: Some(TaskState::Downloading),
            ..Default::default()
        }
    }

    pub fn completed(artifact: Artifact) -> Self {
        Self {
            progress: Some(100.0),
            state: Some(TaskState::Completed {
                artifact,
                completed_at: Utc::now(),
            }),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: Some(TaskState::Error {
                message: message.into(),
                completed_at: Utc::now(),
            }),
            ..Default::default()
        }
    }
}
