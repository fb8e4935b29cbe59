//! 查询索引目标与顺序有效性
//!
//! - `plan_node`：索引扫描之后的下游节点
//! - `order_effectiveness`：索引顺序对目标的满足程度及其判定
//! - `query_goal`：查询目标，决定是否还需要排序并改写下游节点

pub mod order_effectiveness;
pub mod plan_node;
pub mod query_goal;

pub use order_effectiveness::{determine_order_effectiveness, IndexOrdering, OrderEffectiveness};
pub use plan_node::{
    AggregateImplementation, AggregateNode, DistinctImplementation, DistinctNode, LimitNode,
    LimitValue, OrderByColumn, PlanNode, SortNode,
};
pub use query_goal::QueryIndexGoal;
