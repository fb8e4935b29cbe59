//! 连接计划
//!
//! 枚举器产出的计划树：叶子是单节点访问方式，内部节点是两个子计划的连接，
//! 完整计划在需要时带一个尾部排序节点。

use std::fmt;

use serde::Serialize;

use super::bitset::{self, NodeSet};
use crate::core::error::DBResult;
use crate::core::schema::TableId;
use crate::query::optimizer::goal::{
    determine_order_effectiveness, IndexOrdering, OrderEffectiveness, QueryIndexGoal,
};

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Semi,
}

impl JoinType {
    /// 交换内外侧后的连接类型；SEMI 不可交换
    pub fn commuted(&self) -> Option<JoinType> {
        match self {
            JoinType::Inner => Some(JoinType::Inner),
            JoinType::Left => Some(JoinType::Right),
            JoinType::Right => Some(JoinType::Left),
            JoinType::Semi => None,
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Semi => "SEMI",
        };
        f.write_str(name)
    }
}

/// 连接算法
///
/// 两种算法都保持外侧输入的顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum JoinAlgorithm {
    NestedLoop,
    Hash,
}

/// 访问方式，作为代价估算回调的输入
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AccessMethod {
    /// 组扫描读取某张表
    GroupScan { table: TableId },
    /// 按索引顺序扫描
    IndexScan { table: TableId, index: String },
    /// 连接两个已求解的子集
    Join {
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        outer: NodeSet,
        inner: NodeSet,
    },
    /// 尾部排序，比较 fields 列
    Sort { fields: usize },
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMethod::GroupScan { table } => write!(f, "GroupScan({})", table),
            AccessMethod::IndexScan { table, index } => write!(f, "IndexScan({}, {})", table, index),
            AccessMethod::Join {
                algorithm,
                join_type,
                outer,
                inner,
            } => write!(f, "{:?} {} JOIN {:#b} x {:#b}", algorithm, join_type, outer, inner),
            AccessMethod::Sort { fields } => write!(f, "Sort({})", fields),
        }
    }
}

/// 节点的一个候选访问方式及其顺序有效性
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessCandidate {
    pub method: AccessMethod,
    pub effectiveness: OrderEffectiveness,
}

impl AccessCandidate {
    pub fn new(method: AccessMethod, effectiveness: OrderEffectiveness) -> Self {
        Self {
            method,
            effectiveness,
        }
    }

    pub fn group_scan(table: TableId) -> Self {
        Self::new(AccessMethod::GroupScan { table }, OrderEffectiveness::None)
    }

    /// 索引扫描候选，顺序有效性按目标判定
    pub fn index_scan(
        table: TableId,
        index: impl Into<String>,
        goal: &QueryIndexGoal,
        ordering: &mut IndexOrdering,
    ) -> Self {
        let effectiveness = determine_order_effectiveness(goal, ordering);
        Self::new(
            AccessMethod::IndexScan {
                table,
                index: index.into(),
            },
            effectiveness,
        )
    }
}

/// 计划树
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op")]
pub enum JoinPlan {
    Access {
        node: usize,
        name: String,
        method: AccessMethod,
        effectiveness: OrderEffectiveness,
        cost: f64,
    },
    Join {
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        nodes: NodeSet,
        effectiveness: OrderEffectiveness,
        cost: f64,
        outer: Box<JoinPlan>,
        inner: Box<JoinPlan>,
    },
    Sort {
        fields: usize,
        cost: f64,
        input: Box<JoinPlan>,
    },
}

impl JoinPlan {
    /// 累计代价（含子计划）
    pub fn cost(&self) -> f64 {
        match self {
            JoinPlan::Access { cost, .. }
            | JoinPlan::Join { cost, .. }
            | JoinPlan::Sort { cost, .. } => *cost,
        }
    }

    pub fn nodes(&self) -> NodeSet {
        match self {
            JoinPlan::Access { node, .. } => bitset::of(*node),
            JoinPlan::Join { nodes, .. } => *nodes,
            JoinPlan::Sort { input, .. } => input.nodes(),
        }
    }

    /// 访问路径的顺序有效性，用于安装到查询目标
    ///
    /// 尾部排序节点不改变该值：排序由下游 ORDER BY 节点完成，取其输入的有效性。
    pub fn effectiveness(&self) -> OrderEffectiveness {
        match self {
            JoinPlan::Access { effectiveness, .. } | JoinPlan::Join { effectiveness, .. } => {
                *effectiveness
            }
            JoinPlan::Sort { input, .. } => input.effectiveness(),
        }
    }

    pub fn has_sort(&self) -> bool {
        matches!(self, JoinPlan::Sort { .. })
    }

    /// 叶子节点名，外侧优先
    pub fn join_order(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<String>) {
        match self {
            JoinPlan::Access { name, .. } => out.push(name.clone()),
            JoinPlan::Join { outer, inner, .. } => {
                outer.collect_leaves(out);
                inner.collect_leaves(out);
            }
            JoinPlan::Sort { input, .. } => input.collect_leaves(out),
        }
    }

    /// EXPLAIN 输出
    pub fn explain_json(&self) -> DBResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for JoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinPlan::Access { name, method, .. } => write!(f, "{}:{}", name, method),
            JoinPlan::Join {
                algorithm,
                join_type,
                outer,
                inner,
                ..
            } => write!(f, "{:?}{}({}, {})", algorithm, join_type, outer, inner),
            JoinPlan::Sort { fields, input, .. } => write!(f, "Sort[{}]({})", fields, input),
        }
    }
}
