//! 游标生命周期错误
//!
//! 在非法状态下调用 `next()`、重复打开处于 ACTIVE 状态的游标等，都属于调用方的编程错误，
//! 直接失败而不是静默忽略。`close()` 总是幂等的，不会产生此类错误。

use thiserror::Error;

/// 游标结果类型
pub type CursorResult<T> = Result<T, CursorError>;

/// 游标错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CursorError {
    /// 游标未打开（CLOSED 状态）时调用 next/jump
    #[error("游标未打开: {0}")]
    NotOpen(String),

    /// 对 ACTIVE 状态的游标再次调用 open
    #[error("游标已处于活动状态, 不能重复打开: {0}")]
    AlreadyActive(String),

    /// 游标不支持 jump
    #[error("游标不支持 jump 操作: {0}")]
    JumpUnsupported(String),

    /// jump 的目标键不在游标范围内
    #[error("非法的 jump 目标: {0}")]
    InvalidJump(String),

    /// 查询已被取消
    #[error("查询已取消")]
    Cancelled,
}
