//! 范围端点比较错误
//!
//! 仅在需要全序的上下文（如排序）中，对不可比较的端点做比较时产生。

use thiserror::Error;

/// 范围比较结果类型
pub type RangeResult<T> = Result<T, RangeError>;

/// 范围比较错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    /// 两个端点无法排序
    #[error("非法比较: 无法对 <{left}> 与 <{right}> 排序")]
    IllegalComparison { left: String, right: String },
}

impl RangeError {
    pub fn illegal(left: impl std::fmt::Display, right: impl std::fmt::Display) -> Self {
        RangeError::IllegalComparison {
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}
