//! 下游计划节点
//!
//! 索引扫描之后的聚合、排序、去重与 LIMIT 节点。顺序有效性安装后，
//! 查询目标据此改写实现方式或直接移除排序节点。

use std::fmt;

use serde::Serialize;

use crate::core::expression::ColumnRef;

/// 排序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OrderByColumn {
    pub column: ColumnRef,
    pub ascending: bool,
}

impl OrderByColumn {
    pub fn asc(column: ColumnRef) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub fn desc(column: ColumnRef) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

impl fmt::Display for OrderByColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, if self.ascending { "ASC" } else { "DESC" })
    }
}

/// 聚合实现方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggregateImplementation {
    /// 输入已按分组列排好序或已分组
    Presorted,
    /// 部分预聚合后再排序合并
    PreaggregateResort,
    /// 先全量排序再聚合
    Sort,
}

/// GROUP BY 聚合节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateNode {
    pub group_by: Vec<ColumnRef>,
    pub implementation: AggregateImplementation,
}

impl AggregateNode {
    pub fn new(group_by: Vec<ColumnRef>) -> Self {
        Self {
            group_by,
            implementation: AggregateImplementation::Sort,
        }
    }
}

/// ORDER BY 排序节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortNode {
    pub columns: Vec<OrderByColumn>,
}

impl SortNode {
    pub fn new(columns: Vec<OrderByColumn>) -> Self {
        Self { columns }
    }
}

/// 去重实现方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DistinctImplementation {
    Presorted,
    Sort,
}

/// DISTINCT 投影节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctNode {
    pub columns: Vec<ColumnRef>,
    pub implementation: DistinctImplementation,
}

impl DistinctNode {
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        Self {
            columns,
            implementation: DistinctImplementation::Sort,
        }
    }
}

/// LIMIT/OFFSET 的取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LimitValue {
    /// 编译期常量
    Constant(i64),
    /// 参数占位符下标
    Parameter(usize),
}

impl LimitValue {
    pub fn constant(&self) -> Option<i64> {
        match self {
            LimitValue::Constant(v) => Some(*v),
            LimitValue::Parameter(_) => None,
        }
    }
}

/// LIMIT 节点；count 为 None 表示只有 OFFSET
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitNode {
    pub offset: LimitValue,
    pub count: Option<LimitValue>,
}

impl LimitNode {
    pub fn new(offset: LimitValue, count: Option<LimitValue>) -> Self {
        Self { offset, count }
    }

    /// `LIMIT count OFFSET offset`，两者都是常量
    pub fn constant(count: i64, offset: i64) -> Self {
        Self::new(LimitValue::Constant(offset), Some(LimitValue::Constant(count)))
    }
}

/// 下游计划节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlanNode {
    Aggregate(AggregateNode),
    Sort(SortNode),
    Distinct(DistinctNode),
    Limit(LimitNode),
}

impl PlanNode {
    pub fn name(&self) -> &'static str {
        match self {
            PlanNode::Aggregate(_) => "Aggregate",
            PlanNode::Sort(_) => "Sort",
            PlanNode::Distinct(_) => "Distinct",
            PlanNode::Limit(_) => "Limit",
        }
    }
}
