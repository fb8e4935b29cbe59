//! 统一错误处理系统 for GroupDB
//!
//! ## 设计理念
//!
//! 1. **按关注点分类**：每类错误各自一个枚举
//!    - 行形状错误（`RowError`）：复合行、合成行类型构造失败
//!    - 范围比较错误（`RangeError`）：不可比较端点的全序比较
//!    - 游标生命周期错误（`CursorError`）：调用方编程错误
//!    - 优化器错误（`OptimizeError`）：规划不可行，在枚举开始前报告
//!    - 存储错误（`StorageError`）：原样向上传播，不做重试
//!    - 配置错误（`ConfigError`）：配置文件读写与校验
//!
//! 2. **统一接口**：`DBResult<T>` 提供统一的返回类型，子错误通过 `#[from]` 自动转换

use thiserror::Error;

pub mod config;
pub mod cursor;
pub mod optimize;
pub mod range;
pub mod row;
pub mod storage;

pub use config::{ConfigError, ConfigResult};
pub use cursor::{CursorError, CursorResult};
pub use optimize::{OptimizeError, OptimizeResult};
pub use range::{RangeError, RangeResult};
pub use row::{RowError, RowResult};
pub use storage::{StorageError, StorageResult};

/// 统一的数据库错误类型
#[derive(Error, Debug, Clone)]
pub enum DBError {
    #[error("行形状错误: {0}")]
    Row(#[from] RowError),

    #[error("范围比较错误: {0}")]
    Range(#[from] RangeError),

    #[error("游标错误: {0}")]
    Cursor(#[from] CursorError),

    #[error("优化器错误: {0}")]
    Optimize(#[from] OptimizeError),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的结果类型
pub type DBResult<T> = Result<T, DBError>;

impl DBError {
    /// 是否属于调用方编程错误（生命周期或形状错误），这类错误不可恢复
    pub fn is_programming_error(&self) -> bool {
        matches!(self, DBError::Row(_) | DBError::Cursor(_))
    }

    /// 是否来自存储层
    pub fn is_storage(&self) -> bool {
        matches!(self, DBError::Storage(_))
    }
}

impl From<serde_json::Error> for DBError {
    fn from(err: serde_json::Error) -> Self {
        DBError::Internal(format!("序列化错误: {}", err))
    }
}
