//! 优化器错误类型
//!
//! 定义查询规划相关的错误，包括：
//! - 连接图不连通、表数量超限
//! - ORDER BY 与 GROUP BY 不兼容
//! - 顺序有效性重复安装
//!
//! 这些错误都必须在枚举循环开始之前检测出来，而不是在搜索结束后以“没有计划”的形式出现。

use thiserror::Error;

/// 优化器错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// 连接图为空
    #[error("连接图为空")]
    EmptyJoinGraph,

    /// 连接图不连通
    #[error("连接图不连通: 从 {reached} 出发无法到达 {unreached}")]
    DisconnectedJoinGraph { reached: String, unreached: String },

    /// 表数量超过位图容量
    #[error("连接表数量过多: {count} 超过上限 {limit}")]
    TooManyTables { count: usize, limit: usize },

    /// 非法的连接边
    #[error("非法的连接边: {0}")]
    InvalidEdge(String),

    /// ORDER BY 列不是 GROUP BY 列
    #[error("ORDER BY 与 GROUP BY 不兼容: 排序列 {0} 不在分组列中")]
    IncompatibleOrdering(String),

    /// 顺序有效性已经安装过
    #[error("顺序有效性已安装, 不能重复安装")]
    OrderEffectivenessAlreadyInstalled,

    /// 节点没有可用的访问方式
    #[error("节点没有候选访问方式: {0}")]
    NoAccessMethod(String),

    /// 未找到完整计划
    #[error("未找到完整计划: {0}")]
    NoPlanFound(String),
}

/// 优化器结果类型
pub type OptimizeResult<T> = Result<T, OptimizeError>;
