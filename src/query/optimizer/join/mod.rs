//! 连接顺序枚举
//!
//! - `bitset`：连接图节点子集的位图表示
//! - `graph`：连接图（节点、带连接类型的边、邻接位图）
//! - `plan`：访问方法与计划树
//! - `enumerator`：按子集大小的位图 DP，超过阈值时退化为贪心

pub mod bitset;
pub mod enumerator;
pub mod graph;
pub mod plan;

pub use bitset::NodeSet;
pub use enumerator::{JoinOrderOptimizer, JoinOrderResult, OptimizationMethod};
pub use graph::{JoinEdge, JoinGraph, JoinNode};
pub use plan::{AccessCandidate, AccessMethod, JoinAlgorithm, JoinPlan, JoinType};
