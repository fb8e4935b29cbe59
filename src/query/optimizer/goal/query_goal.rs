//! 查询索引目标
//!
//! 每条语句编译时构造一次，把 WHERE 条件与可选的 GROUP BY、ORDER BY、DISTINCT、LIMIT
//! 打包在一起。枚举期间只读使用；选定最优索引后调用一次
//! `install_order_effectiveness` 改写下游节点。

use log::debug;
use serde::Serialize;

use super::order_effectiveness::OrderEffectiveness;
use super::plan_node::{
    AggregateImplementation, AggregateNode, DistinctImplementation, DistinctNode, LimitNode,
    PlanNode, SortNode,
};
use crate::core::error::{OptimizeError, OptimizeResult};
use crate::core::expression::Condition;

/// 查询索引目标
///
/// `Default` 为没有任何下游要求的目标。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryIndexGoal {
    conditions: Vec<Condition>,
    grouping: Option<AggregateNode>,
    ordering: Option<SortNode>,
    distinct: Option<DistinctNode>,
    limit: Option<LimitNode>,
    installed: Option<OrderEffectiveness>,
}

impl QueryIndexGoal {
    /// 创建查询目标
    ///
    /// 同时存在分组和排序时，每个排序列都必须是分组列。
    pub fn new(
        conditions: Vec<Condition>,
        grouping: Option<AggregateNode>,
        ordering: Option<SortNode>,
        distinct: Option<DistinctNode>,
        limit: Option<LimitNode>,
    ) -> OptimizeResult<Self> {
        if let (Some(group), Some(sort)) = (&grouping, &ordering) {
            if let Some(column) = sort
                .columns
                .iter()
                .find(|c| !group.group_by.contains(&c.column))
            {
                return Err(OptimizeError::IncompatibleOrdering(column.column.to_string()));
            }
        }
        Ok(Self {
            conditions,
            grouping,
            ordering,
            distinct,
            limit,
            installed: None,
        })
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn grouping(&self) -> Option<&AggregateNode> {
        self.grouping.as_ref()
    }

    pub fn ordering(&self) -> Option<&SortNode> {
        self.ordering.as_ref()
    }

    pub fn distinct(&self) -> Option<&DistinctNode> {
        self.distinct.as_ref()
    }

    pub fn limit(&self) -> Option<&LimitNode> {
        self.limit.as_ref()
    }

    /// 已安装的顺序有效性
    pub fn installed(&self) -> Option<OrderEffectiveness> {
        self.installed
    }

    /// 给定顺序有效性时，下游是否还需要排序
    pub fn need_sort(&self, effectiveness: OrderEffectiveness) -> bool {
        if self.ordering.is_some() || self.distinct.is_some() {
            return effectiveness != OrderEffectiveness::Sorted;
        }
        if self.grouping.is_some() {
            return !matches!(
                effectiveness,
                OrderEffectiveness::Sorted | OrderEffectiveness::Grouped
            );
        }
        false
    }

    /// 按最终选定索引的顺序有效性改写下游节点，只能调用一次
    pub fn install_order_effectiveness(
        &mut self,
        effectiveness: OrderEffectiveness,
    ) -> OptimizeResult<()> {
        if self.installed.is_some() {
            return Err(OptimizeError::OrderEffectivenessAlreadyInstalled);
        }
        if let Some(grouping) = self.grouping.as_mut() {
            grouping.implementation = match effectiveness {
                OrderEffectiveness::Sorted | OrderEffectiveness::Grouped => {
                    AggregateImplementation::Presorted
                }
                OrderEffectiveness::PartialGrouped => AggregateImplementation::PreaggregateResort,
                OrderEffectiveness::None => AggregateImplementation::Sort,
            };
        }
        if effectiveness == OrderEffectiveness::Sorted && self.ordering.take().is_some() {
            debug!("索引已满足排序要求, 移除排序节点");
        }
        if let Some(distinct) = self.distinct.as_mut() {
            distinct.implementation = if effectiveness == OrderEffectiveness::Sorted {
                DistinctImplementation::Presorted
            } else {
                DistinctImplementation::Sort
            };
        }
        self.installed = Some(effectiveness);
        Ok(())
    }

    /// 剩余排序需要比较的列数
    pub fn sort_fields(&self) -> usize {
        if let Some(ordering) = &self.ordering {
            ordering.columns.len()
        } else if let Some(distinct) = &self.distinct {
            distinct.columns.len()
        } else if let Some(grouping) = &self.grouping {
            grouping.group_by.len()
        } else {
            0
        }
    }

    /// 查询结束前必须产出的行数，-1 表示无界
    pub fn get_limit(&self) -> i64 {
        let Some(limit) = &self.limit else {
            return -1;
        };
        match (limit.offset.constant(), limit.count.and_then(|c| c.constant())) {
            (Some(offset), Some(count)) => offset.saturating_add(count),
            _ => -1,
        }
    }

    /// 索引扫描之后的下游节点，按执行顺序
    pub fn pipeline(&self) -> Vec<PlanNode> {
        let mut nodes = Vec::new();
        if let Some(grouping) = &self.grouping {
            nodes.push(PlanNode::Aggregate(grouping.clone()));
        }
        if let Some(distinct) = &self.distinct {
            nodes.push(PlanNode::Distinct(distinct.clone()));
        }
        if let Some(ordering) = &self.ordering {
            nodes.push(PlanNode::Sort(ordering.clone()));
        }
        if let Some(limit) = &self.limit {
            nodes.push(PlanNode::Limit(limit.clone()));
        }
        nodes
    }
}
