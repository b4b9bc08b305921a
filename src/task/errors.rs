use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("任务未找到: {0}")]
    NotFound(String),

    #[error("任务文件尚未就绪: {0}")]
    NotReady(String),
}
