use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 还原点创建失败，整个会话必须在任何修改之前中止
    #[error("Restore point could not be created: {0}")]
    RestorePoint(String),

    /// 外部计划生成器违反了线格式（不是包含两个字段的对象）
    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Reasoning service error: {0}")]
    Reasoning(String),

    #[error("OS facade error: {0}")]
    Facade(String),

    #[error("Background task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

impl OptimizerError {
    /// 把 io::Error 按权限/其它分类，并附上出错的路径
    pub fn from_io_at(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            OptimizerError::PermissionDenied(path.display().to_string())
        } else {
            OptimizerError::Io(err)
        }
    }
}
