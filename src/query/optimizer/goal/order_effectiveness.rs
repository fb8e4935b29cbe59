//! 顺序有效性
//!
//! 候选索引的自然扫描顺序能在多大程度上满足查询的排序、分组和去重要求。
//! 强度递增：NONE < PARTIAL_GROUPED < GROUPED < SORTED。

use std::fmt;

use log::trace;
use serde::Serialize;

use super::plan_node::OrderByColumn;
use super::query_goal::QueryIndexGoal;
use crate::core::expression::ColumnRef;

/// 顺序有效性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum OrderEffectiveness {
    None,
    /// 部分分组：分组列出现在索引中，但被其他列打断
    PartialGrouped,
    /// 已分组但未按要求排序
    Grouped,
    Sorted,
}

impl fmt::Display for OrderEffectiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderEffectiveness::None => "NONE",
            OrderEffectiveness::PartialGrouped => "PARTIAL_GROUPED",
            OrderEffectiveness::Grouped => "GROUPED",
            OrderEffectiveness::Sorted => "SORTED",
        };
        f.write_str(name)
    }
}

/// 候选索引扫描的列顺序
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexOrdering {
    /// 索引列及扫描方向，按索引顺序
    pub columns: Vec<OrderByColumn>,
    /// 前导等值条件覆盖的索引列数
    pub n_equals: usize,
    /// 被等值条件固定为常量的列（可以不在索引中）
    pub equality_columns: Vec<ColumnRef>,
}

impl IndexOrdering {
    pub fn new(columns: Vec<OrderByColumn>) -> Self {
        Self {
            columns,
            n_equals: 0,
            equality_columns: Vec::new(),
        }
    }

    /// 前 n 个索引列由等值条件固定
    pub fn with_equalities(mut self, n_equals: usize, extra: Vec<ColumnRef>) -> Self {
        self.n_equals = n_equals.min(self.columns.len());
        self.equality_columns = self.columns[..self.n_equals]
            .iter()
            .map(|c| c.column)
            .chain(extra)
            .collect();
        self
    }

    /// 第 n_equals 列之后的位置
    fn position_after_equals(&self, column: &ColumnRef) -> Option<usize> {
        self.columns[self.n_equals..]
            .iter()
            .position(|c| c.column == *column)
    }
}

/// 判定索引相对于目标的顺序有效性
///
/// ORDER BY 能被满足时会就地调整索引列的扫描方向；否则不修改 index。
pub fn determine_order_effectiveness(
    goal: &QueryIndexGoal,
    index: &mut IndexOrdering,
) -> OrderEffectiveness {
    let mut result = OrderEffectiveness::None;

    if let Some(ordering) = goal.ordering() {
        if let Some(reverse) = match_ordering(&ordering.columns, index) {
            for (column, flip) in index.columns.iter_mut().zip(reverse) {
                if flip {
                    column.ascending = !column.ascending;
                }
            }
            result = OrderEffectiveness::Sorted;
        }
    }

    if let Some(grouping) = goal.grouping() {
        let group_by = &grouping.group_by;
        let mut any_found = false;
        let mut all_found = true;
        for target in group_by {
            match index.position_after_equals(target) {
                None => {
                    all_found = false;
                    if !index.equality_columns.contains(target) {
                        continue;
                    }
                }
                // 被其他列隔开，只能部分分组
                Some(found) if found >= group_by.len() => all_found = false,
                Some(_) => {}
            }
            any_found = true;
        }
        if any_found {
            let effectiveness = if !all_found {
                OrderEffectiveness::PartialGrouped
            } else if result == OrderEffectiveness::Sorted {
                result
            } else {
                OrderEffectiveness::Grouped
            };
            trace!("分组有效性: {}", effectiveness);
            return effectiveness;
        }
    } else if let Some(distinct) = goal.distinct() {
        let all_found = distinct.columns.iter().all(|target| {
            index
                .position_after_equals(target)
                .map(|found| found < distinct.columns.len())
                .unwrap_or(false)
        });
        if all_found {
            return OrderEffectiveness::Sorted;
        }
    }
    result
}

/// 逐列匹配 ORDER BY，成功时返回每个索引列是否需要反向扫描
fn match_ordering(order_by: &[OrderByColumn], index: &IndexOrdering) -> Option<Vec<bool>> {
    let n = index.columns.len();
    let mut reverse = vec![false; n];
    let mut idx = index.n_equals;
    for target in order_by {
        if let Some(index_column) = index.columns.get(idx) {
            if index_column.column == target.column {
                if index_column.ascending != target.ascending {
                    reverse[idx] = true;
                    if idx == index.n_equals {
                        // 等值段随第一个排序列一起反向
                        reverse[..index.n_equals].iter_mut().for_each(|r| *r = true);
                    }
                }
                idx += 1;
                continue;
            }
        }
        // 被等值条件固定的列不影响顺序
        if index.equality_columns.contains(&target.column) {
            continue;
        }
        return None;
    }
    if idx > 0 && idx < n && reverse[idx - 1] {
        reverse[idx..].iter_mut().for_each(|r| *r = true);
    }
    Some(reverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::TableId;
    use crate::query::optimizer::goal::plan_node::{
        AggregateNode, DistinctNode, OrderByColumn, SortNode,
    };

    fn c(p: usize) -> ColumnRef {
        ColumnRef::new(TableId(1), p)
    }

    fn index(cols: &[usize]) -> IndexOrdering {
        IndexOrdering::new(cols.iter().map(|p| OrderByColumn::asc(c(*p))).collect())
    }

    fn goal(
        group: Option<Vec<usize>>,
        order: Option<Vec<OrderByColumn>>,
        distinct: Option<Vec<usize>>,
    ) -> QueryIndexGoal {
        QueryIndexGoal::new(
            Vec::new(),
            group.map(|g| AggregateNode::new(g.into_iter().map(c).collect())),
            order.map(SortNode::new),
            distinct.map(|d| DistinctNode::new(d.into_iter().map(c).collect())),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_ordering_prefix_is_sorted() {
        let g = goal(None, Some(vec![OrderByColumn::asc(c(0)), OrderByColumn::asc(c(1))]), None);
        let mut idx = index(&[0, 1, 2]);
        assert_eq!(determine_order_effectiveness(&g, &mut idx), OrderEffectiveness::Sorted);
    }

    #[test]
    fn test_ordering_gap_is_none() {
        let g = goal(None, Some(vec![OrderByColumn::asc(c(1))]), None);
        let mut idx = index(&[0, 1]);
        assert_eq!(determine_order_effectiveness(&g, &mut idx), OrderEffectiveness::None);
    }

    #[test]
    fn test_equality_prefix_is_skipped() {
        // WHERE c0 = ? ORDER BY c1
        let g = goal(None, Some(vec![OrderByColumn::asc(c(1))]), None);
        let mut idx = index(&[0, 1]).with_equalities(1, Vec::new());
        assert_eq!(determine_order_effectiveness(&g, &mut idx), OrderEffectiveness::Sorted);

        // ORDER BY c0, c1 同样满足：c0 被固定
        let g = goal(None, Some(vec![OrderByColumn::asc(c(0)), OrderByColumn::asc(c(1))]), None);
        let mut idx = index(&[0, 1]).with_equalities(1, Vec::new());
        assert_eq!(determine_order_effectiveness(&g, &mut idx), OrderEffectiveness::Sorted);
    }

    #[test]
    fn test_descending_reverses_scan() {
        let g = goal(None, Some(vec![OrderByColumn::desc(c(1))]), None);
        let mut idx = index(&[0, 1, 2]).with_equalities(1, Vec::new());
        assert_eq!(determine_order_effectiveness(&g, &mut idx), OrderEffectiveness::Sorted);
        assert!(idx.columns.iter().all(|col| !col.ascending));
    }

    #[test]
    fn test_grouping() {
        let g = goal(Some(vec![0, 1]), None, None);
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[1, 0, 2])),
            OrderEffectiveness::Grouped
        );
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[0, 2, 1])),
            OrderEffectiveness::PartialGrouped
        );
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[2, 3])),
            OrderEffectiveness::None
        );
    }

    #[test]
    fn test_grouping_and_ordering_sorted() {
        let g = goal(Some(vec![0, 1]), Some(vec![OrderByColumn::asc(c(0))]), None);
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[0, 1])),
            OrderEffectiveness::Sorted
        );
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[1, 0])),
            OrderEffectiveness::Grouped
        );
    }

    #[test]
    fn test_distinct() {
        let g = goal(None, None, Some(vec![1, 0]));
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[0, 1, 2])),
            OrderEffectiveness::Sorted
        );
        assert_eq!(
            determine_order_effectiveness(&g, &mut index(&[0, 2, 1])),
            OrderEffectiveness::None
        );
    }
}
