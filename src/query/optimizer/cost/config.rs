//! 代价模型参数
//!
//! 默认代价估算器使用的常量。参数按页和行两级计价，组扫描按顺序页计价，
//! 索引扫描回表按随机页计价。

use serde::{Deserialize, Serialize};

/// 代价模型参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModelConfig {
    /// 顺序读一页
    pub seq_page_cost: f64,
    /// 随机读一页
    pub random_page_cost: f64,
    /// 每页平均行数，组内父子行交错存放
    pub rows_per_page: f64,
    /// 处理一行
    pub cpu_tuple_cost: f64,
    /// 处理一个索引项
    pub cpu_index_tuple_cost: f64,
    /// 一次比较或连接条件求值
    pub cpu_operator_cost: f64,
    /// 哈希表构建的额外系数
    pub hash_build_overhead: f64,
    /// 排序中每次比较的系数
    pub sort_comparison_cost: f64,
    /// 没有统计信息时的连接选择性
    pub default_join_selectivity: f64,
    /// 没有统计信息时索引范围扫描的选择性
    pub default_index_selectivity: f64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            seq_page_cost: 1.0,
            random_page_cost: 4.0,
            rows_per_page: 50.0,
            cpu_tuple_cost: 0.01,
            cpu_index_tuple_cost: 0.005,
            cpu_operator_cost: 0.0025,
            hash_build_overhead: 0.1,
            sort_comparison_cost: 1.0,
            default_join_selectivity: 0.1,
            default_index_selectivity: 0.1,
        }
    }
}

impl CostModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内存存储：没有页读取开销
    pub fn for_in_memory() -> Self {
        Self {
            seq_page_cost: 0.0,
            random_page_cost: 0.0,
            ..Default::default()
        }
    }

    pub fn with_join_selectivity(mut self, selectivity: f64) -> Self {
        self.default_join_selectivity = selectivity.clamp(0.0, 1.0);
        self
    }

    pub fn with_index_selectivity(mut self, selectivity: f64) -> Self {
        self.default_index_selectivity = selectivity.clamp(0.0, 1.0);
        self
    }
}
