//! 优化器配置
//! 从全局配置的 `[optimizer]` 段派生

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// DP 表按位掩码分配，节点数超过此值时总是使用贪心
pub const MAX_DP_NODES: usize = 20;

/// 连接枚举器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// 用精确 DP 求解的最大节点数，超过则使用贪心
    pub dp_threshold: usize,
    /// 连接表数量上限，不超过 64
    pub max_join_tables: usize,
    /// 是否考虑哈希连接
    pub consider_hash_join: bool,
    /// 是否以 debug 级别输出完整计划
    pub trace_plans: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            dp_threshold: 12,
            max_join_tables: 64,
            consider_hash_join: true,
            trace_plans: false,
        }
    }
}

impl From<&Config> for OptimizerConfig {
    fn from(config: &Config) -> Self {
        config.optimizer.clone()
    }
}
