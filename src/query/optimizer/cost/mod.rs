//! 代价估算
//!
//! - `CostEstimator`：连接枚举器调用的代价回调，必须是纯函数
//! - `calculator`：基于行数的默认实现
//! - `config`：代价模型参数

pub mod calculator;
pub mod config;

pub use calculator::CostCalculator;
pub use config::CostModelConfig;

use crate::query::optimizer::goal::OrderEffectiveness;
use crate::query::optimizer::join::bitset::NodeSet;
use crate::query::optimizer::join::plan::AccessMethod;

/// 代价估算回调
///
/// 返回在 subset 上以 method 执行单个算子的增量代价。相同输入必须返回相同结果，
/// 且不得做 I/O，枚举器依赖这一点保证规划可复现。
pub trait CostEstimator: Send + Sync {
    fn cost(&self, subset: NodeSet, method: &AccessMethod, effectiveness: OrderEffectiveness) -> f64;
}

impl<F> CostEstimator for F
where
    F: Fn(NodeSet, &AccessMethod, OrderEffectiveness) -> f64 + Send + Sync,
{
    fn cost(&self, subset: NodeSet, method: &AccessMethod, effectiveness: OrderEffectiveness) -> f64 {
        self(subset, method, effectiveness)
    }
}
