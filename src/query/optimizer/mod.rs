//! 查询优化器模块
//!
//! 规划阶段是纯计算：不做 I/O，输入不可变，可并发用于互不相关的查询。
//!
//! ## 模块结构
//!
//! - `range` - 范围端点代数，把 WHERE 条件变成索引扫描边界
//! - `goal` - 查询索引目标，判定索引扫描能否省掉排序、分组和去重
//! - `join` - 连接图与连接顺序枚举
//! - `cost` - 代价估算回调及默认实现
//!
//! ## 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use groupdb::core::schema::TableId;
//! use groupdb::query::optimizer::{
//!     AccessCandidate, CostCalculator, CostModelConfig, JoinGraph, JoinNode,
//!     JoinOrderOptimizer, JoinType, QueryIndexGoal,
//! };
//!
//! let mut graph = JoinGraph::new();
//! let c = graph.add_node(JoinNode::new("customer", vec![AccessCandidate::group_scan(TableId(0))]));
//! let o = graph.add_node(JoinNode::new("order", vec![AccessCandidate::group_scan(TableId(1))]));
//! graph.add_edge(c, o, JoinType::Inner, vec![]).unwrap();
//!
//! let calculator = CostCalculator::new(CostModelConfig::default(), vec![100, 1000]);
//! let optimizer = JoinOrderOptimizer::new(Arc::new(calculator));
//! let goal = QueryIndexGoal::default();
//! let result = optimizer.optimize_join_order(&graph, &goal).unwrap();
//! assert_eq!(result.plan.join_order().len(), 2);
//! ```

pub mod cost;
pub mod goal;
pub mod join;
pub mod optimizer_config;
pub mod range;

pub use cost::{CostCalculator, CostEstimator, CostModelConfig};
pub use goal::{
    determine_order_effectiveness, IndexOrdering, OrderByColumn, OrderEffectiveness, PlanNode,
    QueryIndexGoal,
};
pub use join::{
    AccessCandidate, AccessMethod, JoinAlgorithm, JoinGraph, JoinNode, JoinOrderOptimizer,
    JoinOrderResult, JoinPlan, JoinType, OptimizationMethod,
};
pub use optimizer_config::{OptimizerConfig, MAX_DP_NODES};
pub use range::{ColumnRanges, RangeEndpoint, RangeSegment};
