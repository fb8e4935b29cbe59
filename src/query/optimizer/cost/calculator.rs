//! 默认代价估算器
//!
//! 基于每个连接图节点的估计行数计算代价。返回值是单个算子的增量代价，
//! 计划的总代价由枚举器把子计划代价累加上去。

use std::collections::HashMap;

use super::config::CostModelConfig;
use super::CostEstimator;
use crate::query::optimizer::goal::OrderEffectiveness;
use crate::query::optimizer::join::bitset::{self, NodeSet};
use crate::query::optimizer::join::plan::{AccessMethod, JoinAlgorithm};

/// 代价计算器
#[derive(Debug, Clone)]
pub struct CostCalculator {
    config: CostModelConfig,
    /// 节点下标 -> 估计行数
    node_rows: Vec<f64>,
    /// 索引名 -> 选择性
    index_selectivity: HashMap<String, f64>,
    /// 需要产出的行数上限，-1 表示无界
    limit: i64,
}

impl CostCalculator {
    pub fn new(config: CostModelConfig, node_rows: Vec<u64>) -> Self {
        Self {
            config,
            node_rows: node_rows.into_iter().map(|r| r as f64).collect(),
            index_selectivity: HashMap::new(),
            limit: -1,
        }
    }

    pub fn with_index_selectivity(mut self, index: impl Into<String>, selectivity: f64) -> Self {
        self.index_selectivity
            .insert(index.into(), selectivity.clamp(0.0, 1.0));
        self
    }

    /// 有序扫描在产出 limit 行后即可停止
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn config(&self) -> &CostModelConfig {
        &self.config
    }

    /// 子集连接后的估计行数
    pub fn estimate_rows(&self, set: NodeSet) -> f64 {
        let mut rows = 1.0;
        for i in bitset::iter(set) {
            rows *= self.node_rows.get(i).copied().unwrap_or(1.0);
        }
        let joins = bitset::count(set).saturating_sub(1) as i32;
        (rows * self.config.default_join_selectivity.powi(joins)).max(1.0)
    }

    fn capped(&self, rows: f64, effectiveness: OrderEffectiveness) -> f64 {
        if self.limit >= 0 && effectiveness == OrderEffectiveness::Sorted {
            rows.min(self.limit.max(1) as f64)
        } else {
            rows
        }
    }

    fn scan_cost(&self, rows: f64, page_cost: f64, per_row: f64) -> f64 {
        let pages = (rows / self.config.rows_per_page).ceil().max(1.0);
        pages * page_cost + rows * per_row
    }

    fn sort_cost(&self, rows: f64, fields: usize) -> f64 {
        let comparisons = rows * rows.max(2.0).log2();
        comparisons * fields.max(1) as f64 * self.config.cpu_operator_cost * self.config.sort_comparison_cost
    }
}

impl CostEstimator for CostCalculator {
    fn cost(&self, subset: NodeSet, method: &AccessMethod, effectiveness: OrderEffectiveness) -> f64 {
        let c = &self.config;
        match method {
            AccessMethod::GroupScan { .. } => {
                let rows = self.capped(self.estimate_rows(subset), effectiveness);
                self.scan_cost(rows, c.seq_page_cost, c.cpu_tuple_cost)
            }
            AccessMethod::IndexScan { index, .. } => {
                let selectivity = self
                    .index_selectivity
                    .get(index)
                    .copied()
                    .unwrap_or(c.default_index_selectivity);
                let rows = self.capped(self.estimate_rows(subset) * selectivity, effectiveness);
                self.scan_cost(
                    rows,
                    c.random_page_cost,
                    c.cpu_index_tuple_cost + c.cpu_tuple_cost,
                )
            }
            AccessMethod::Join {
                algorithm,
                outer,
                inner,
                ..
            } => {
                let outer_rows = self.estimate_rows(*outer);
                let inner_rows = self.estimate_rows(*inner);
                let output = self.estimate_rows(subset) * c.cpu_tuple_cost;
                match algorithm {
                    JoinAlgorithm::NestedLoop => outer_rows * inner_rows * c.cpu_operator_cost + output,
                    JoinAlgorithm::Hash => {
                        (outer_rows + inner_rows * (1.0 + c.hash_build_overhead)) * c.cpu_operator_cost
                            + output
                    }
                }
            }
            AccessMethod::Sort { fields } => self.sort_cost(self.estimate_rows(subset), *fields),
        }
    }
}
