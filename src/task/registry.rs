use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::errors::RegistryError;
use super::models::{Artifact, Task, TaskId, TaskSnapshot, TaskStatus, TaskSummary, TaskUpdate};
use crate::common::files::schedule_removal;

/// 内存中的任务表
///
/// 请求处理和各个下载 worker 共享同一份（`Clone` 只复制 `Arc`）。
/// 每个操作都在对应条目的分片锁内完成，状态和附带数据总是一起变化。
#[derive(Clone)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<TaskId, Task>>, // task_id -> Task
    retention: TimeDelta,
}

impl TaskRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
        }
    }

    /// 新建任务，初始状态为 `started`
    pub fn create(&self, title: impl Into<String>) -> TaskId {
        let title = title.into();
        loop {
            let id = TaskId::generate();
            if let Entry::Vacant(slot) = self.tasks.entry(id.clone()) {
                slot.insert(Task::new(id.clone(), title));
                debug!("创建任务: {}", id);
                return id;
            }
            warn!("任务ID冲突，重新生成: {}", id);
        }
    }

    pub fn get(&self, id: &str) -> Option<TaskSnapshot> {
        self.tasks.get(id).map(|task| task.snapshot())
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.tasks.get(id).map(|task| task.status())
    }

    /// 合并更新；任务不存在（可能已被清理）或已结束时返回 false
    pub fn update(&self, id: &str, update: TaskUpdate) -> bool {
        match self.tasks.get_mut(id) {
            Some(mut task) => {
                let applied = task.apply(update);
                if !applied {
                    debug!("任务 {} 已结束，忽略更新", id);
                }
                applied
            }
            None => {
                debug!("任务 {} 不存在，忽略更新", id);
                false
            }
        }
    }

    pub fn list_active(&self) -> Vec<TaskSummary> {
        self.list_active_at(Utc::now())
    }

    /// 返回进行中以及仍在保留期内的已完成任务，同时删除过期任务
    pub fn list_active_at(&self, now: DateTime<Utc>) -> Vec<TaskSummary> {
        let mut active = Vec::new();
        let mut orphaned = Vec::new();
        self.tasks.retain(|id, task| {
            if task.is_expired(now, self.retention) {
                debug!("清理过期任务: {}", id);
                orphaned.extend(task.artifact_path());
                return false;
            }
            if let Some(summary) = task.summary() {
                active.push(summary);
            }
            true
        });
        discard_artifacts(orphaned);
        active.sort_by_key(|summary| summary.created_at);
        active
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// 删除过期任务，未被取走的产物文件一并删除
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        let mut orphaned = Vec::new();
        self.tasks.retain(|_, task| {
            if task.is_expired(now, self.retention) {
                removed += 1;
                orphaned.extend(task.artifact_path());
                return false;
            }
            true
        });
        discard_artifacts(orphaned);
        removed
    }

    /// 取走已完成任务的产物，并在同一步中删除任务
    ///
    /// 只有一个调用者能拿到产物，之后再取返回 `NotFound`。
    pub fn consume_file(&self, id: &str) -> Result<Artifact, RegistryError> {
        if let Some((_, task)) = self
            .tasks
            .remove_if(id, |_, task| task.status() == TaskStatus::Completed)
        {
            return task
                .into_artifact()
                .ok_or_else(|| RegistryError::NotReady(id.to_string()));
        }

        if self.tasks.contains_key(id) {
            Err(RegistryError::NotReady(id.to_string()))
        } else {
            Err(RegistryError::NotFound(id.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 启动后台定时清理，不依赖 `/active` 被调用
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.sweep_expired();
                if removed > 0 {
                    info!("定时清理了 {} 个过期任务", removed);
                }
            }
        })
    }
}

// 在分片锁释放之后调用
fn discard_artifacts(paths: Vec<PathBuf>) {
    for path in paths {
        info!("删除未取走的文件: {}", path.display());
        schedule_removal(path, Duration::ZERO);
    }
}
