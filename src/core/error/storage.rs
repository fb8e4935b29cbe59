//! 存储层错误类型
//!
//! 行源（row source）在 `open/next` 期间产生的错误。核心层从不捕获或抑制这些错误，
//! 也不在内部重试；重试策略属于存储层之外的调用方。

use thiserror::Error;

/// 存储层结果类型
pub type StorageResult<T> = Result<T, StorageError>;

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("IO错误: {0}")]
    Io(String),
    #[error("未找到: {0}")]
    NotFound(String),
    #[error("操作不支持: {0}")]
    NotSupported(String),
    #[error("事务错误: {0}")]
    Transaction(String),
    #[error("锁超时: {0}")]
    LockTimeout(String),
    #[error("无效输入: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// 由调用方决定是否重试，核心层仅提供判断
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::LockTimeout(_) | StorageError::Transaction(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}
