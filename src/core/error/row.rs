//! 行形状错误类型
//!
//! 构造复合行（扁平行、乘积行）或合成行类型时的形状校验失败。
//! 这类错误总是使本次构造失败，并携带足够的上下文（类型名、下标）用于定位规划器缺陷。

use thiserror::Error;

/// 行形状结果类型
pub type RowResult<T> = Result<T, RowError>;

/// 行形状错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    /// 字段数量不匹配
    #[error("字段数量不匹配: {row_type} 期望 {expected} 个字段, 实际 {actual} 个")]
    FieldCountMismatch {
        row_type: String,
        expected: usize,
        actual: usize,
    },

    /// 某个下标处的运行时值类型错误
    #[error("字段类型错误: {row_type} 第 {index} 个字段期望 {expected}, 实际 {actual}")]
    FieldTypeMismatch {
        row_type: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// 输入行的行类型与合成类型声明的输入类型不一致
    #[error("输入行类型错误: {row_type} 的 {side} 输入期望 {expected}, 实际 {actual}")]
    InputTypeMismatch {
        row_type: String,
        side: &'static str,
        expected: String,
        actual: String,
    },

    /// 字段下标越界
    #[error("字段下标越界: {row_type} 只有 {n_fields} 个字段, 访问第 {index} 个")]
    FieldIndexOutOfRange {
        row_type: String,
        index: usize,
        n_fields: usize,
    },

    /// 组合行的两个输入不在同一 HKey 前缀下
    #[error("HKey 不匹配: {row_type} 的输入 {left} 与 {right} 不共享所需的前缀")]
    HKeyMismatch {
        row_type: String,
        left: String,
        right: String,
    },

    /// 行中没有所引用的列
    #[error("列不在行中: {row_type} 不包含 {column}")]
    ColumnNotInRow { row_type: String, column: String },

    /// 行类型种类不符合构造要求
    #[error("行类型种类错误: {0}")]
    WrongKind(String),

    /// 非法的合成行类型请求
    #[error("非法的合成行类型: {0}")]
    InvalidSyntheticType(String),

    /// 未知的表
    #[error("未知的表: {0}")]
    UnknownTable(String),

    /// 非法的模式定义
    #[error("非法的模式定义: {0}")]
    InvalidSchema(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_display_carries_context() {
        let err = RowError::FieldCountMismatch {
            row_type: "flatten(customer, order)".to_string(),
            expected: 5,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("flatten(customer, order)"));
        assert!(msg.contains('5'));
        assert!(msg.contains('4'));
    }
}
