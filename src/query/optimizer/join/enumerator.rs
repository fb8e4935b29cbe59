//! 连接顺序优化器
//!
//! 基于代价的连接顺序枚举，为连接图选择最优的连接顺序与访问方式
//!
//! ## 算法
//!
//! - 动态规划（DP）：按子集大小自底向上，只处理连通子集；每个子集拆成两个已求解的
//!   连通子集并由一条边相连。DP 表以位掩码为下标，每格保存最优代价、
//!   选择方式与平局键，适用于不超过 `dp_threshold` 个节点的图
//! - 贪心：超过阈值时，从代价最低的单节点出发，每次接入代价最低的相邻节点
//!
//! 候选计划按"原始代价 + 目标要求的尾部排序代价"比较，代价相同时按外侧位掩码、
//! 连接算法、候选下标依次决胜，结果完全可复现。
//! 图为空、节点过多、节点没有候选访问方式或图不连通，都在枚举开始前报错。

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::Serialize;

use super::bitset::{self, NodeSet};
use super::graph::JoinGraph;
use super::plan::{AccessMethod, JoinAlgorithm, JoinPlan, JoinType};
use crate::core::error::{OptimizeError, OptimizeResult};
use crate::query::optimizer::cost::CostEstimator;
use crate::query::optimizer::goal::{OrderEffectiveness, QueryIndexGoal};
use crate::query::optimizer::optimizer_config::{OptimizerConfig, MAX_DP_NODES};

/// 优化方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptimizationMethod {
    /// 动态规划
    DynamicProgramming,
    /// 贪心算法
    Greedy,
}

/// 连接顺序优化结果
#[derive(Debug, Clone, Serialize)]
pub struct JoinOrderResult {
    pub plan: JoinPlan,
    /// 总代价，含尾部排序
    pub cost: f64,
    pub method: OptimizationMethod,
    /// 代价回调的调用次数
    pub cost_calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Choice {
    Access {
        node: usize,
        candidate: usize,
    },
    Join {
        outer: NodeSet,
        inner: NodeSet,
        algorithm: JoinAlgorithm,
        join_type: JoinType,
    },
}

/// DP 表的一格
#[derive(Debug, Clone, Copy)]
struct Cell {
    /// 不含尾部排序的累计代价
    cost: f64,
    /// 参与比较的代价
    ranked: f64,
    effectiveness: OrderEffectiveness,
    choice: Choice,
    tie: (NodeSet, JoinAlgorithm, usize),
}

impl Cell {
    fn beats(&self, other: &Cell) -> bool {
        self.ranked < other.ranked || (self.ranked == other.ranked && self.tie < other.tie)
    }
}

/// 连接顺序优化器
pub struct JoinOrderOptimizer {
    estimator: Arc<dyn CostEstimator>,
    config: OptimizerConfig,
}

/// 一次优化过程的状态
struct Search<'a> {
    graph: &'a JoinGraph,
    goal: &'a QueryIndexGoal,
    estimator: &'a dyn CostEstimator,
    config: &'a OptimizerConfig,
    names: Vec<String>,
    calls: usize,
}

impl JoinOrderOptimizer {
    pub fn new(estimator: Arc<dyn CostEstimator>) -> Self {
        Self {
            estimator,
            config: OptimizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置DP阈值
    pub fn with_dp_threshold(mut self, threshold: usize) -> Self {
        self.config.dp_threshold = threshold;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// 为连接图选择最优计划
    pub fn optimize_join_order(
        &self,
        graph: &JoinGraph,
        goal: &QueryIndexGoal,
    ) -> OptimizeResult<JoinOrderResult> {
        self.check_feasible(graph)?;

        let mut search = Search {
            graph,
            goal,
            estimator: self.estimator.as_ref(),
            config: &self.config,
            names: graph.names(),
            calls: 0,
        };

        let dp_limit = self.config.dp_threshold.min(MAX_DP_NODES);
        let (plan, method) = if graph.len() <= dp_limit {
            (search.dynamic_programming()?, OptimizationMethod::DynamicProgramming)
        } else {
            warn!(
                "连接图有 {} 个节点, 超过 DP 阈值 {}, 改用贪心算法",
                graph.len(),
                dp_limit
            );
            (search.greedy()?, OptimizationMethod::Greedy)
        };

        debug!(
            "连接顺序选定: {} (代价 {:.3}, {:?}, {} 次代价估算)",
            plan,
            plan.cost(),
            method,
            search.calls
        );
        if self.config.trace_plans {
            match plan.explain_json() {
                Ok(json) => debug!("计划详情:\n{}", json),
                Err(e) => warn!("计划序列化失败: {}", e),
            }
        }
        Ok(JoinOrderResult {
            cost: plan.cost(),
            plan,
            method,
            cost_calls: search.calls,
        })
    }

    /// 枚举前的可行性检查
    fn check_feasible(&self, graph: &JoinGraph) -> OptimizeResult<()> {
        if graph.is_empty() {
            return Err(OptimizeError::EmptyJoinGraph);
        }
        let limit = self.config.max_join_tables.min(bitset::CAPACITY);
        if graph.len() > limit {
            return Err(OptimizeError::TooManyTables {
                count: graph.len(),
                limit,
            });
        }
        if let Some(node) = graph.nodes().iter().find(|n| n.candidates.is_empty()) {
            return Err(OptimizeError::NoAccessMethod(node.name.clone()));
        }
        let all = bitset::full(graph.len());
        let reached = graph.reachable(0, all);
        if reached != all {
            let names = graph.names();
            return Err(OptimizeError::DisconnectedJoinGraph {
                reached: bitset::to_string(reached, &names),
                unreached: bitset::to_string(bitset::difference(all, reached), &names),
            });
        }
        Ok(())
    }
}

impl<'a> Search<'a> {
    fn estimate(&mut self, subset: NodeSet, method: &AccessMethod, eff: OrderEffectiveness) -> f64 {
        self.calls += 1;
        self.estimator.cost(subset, method, eff)
    }

    /// 目标要求的尾部排序代价
    fn sort_penalty(&mut self, subset: NodeSet, eff: OrderEffectiveness) -> f64 {
        if self.goal.need_sort(eff) {
            let method = AccessMethod::Sort {
                fields: self.goal.sort_fields(),
            };
            self.estimate(subset, &method, eff)
        } else {
            0.0
        }
    }

    /// 单节点的最优访问方式
    fn best_access(&mut self, node: usize) -> OptimizeResult<Cell> {
        let graph = self.graph;
        let set = bitset::of(node);
        let mut best: Option<Cell> = None;
        for (i, candidate) in graph.nodes()[node].candidates.iter().enumerate() {
            let eff = candidate.effectiveness;
            let cost = self.estimate(set, &candidate.method, eff);
            let cell = Cell {
                cost,
                ranked: cost + self.sort_penalty(set, eff),
                effectiveness: eff,
                choice: Choice::Access { node, candidate: i },
                tie: (set, JoinAlgorithm::NestedLoop, i),
            };
            if best.as_ref().map_or(true, |b| cell.beats(b)) {
                best = Some(cell);
            }
        }
        best.ok_or_else(|| OptimizeError::NoAccessMethod(graph.nodes()[node].name.clone()))
    }

    fn algorithms(&self) -> &'static [JoinAlgorithm] {
        if self.config.consider_hash_join {
            &[JoinAlgorithm::NestedLoop, JoinAlgorithm::Hash]
        } else {
            &[JoinAlgorithm::NestedLoop]
        }
    }

    /// 用 a、b 两个已求解子集组成 subset 的最优连接，两个方向都尝试
    fn best_join(&mut self, subset: NodeSet, a: &Cell, a_set: NodeSet, b: &Cell, b_set: NodeSet) -> Option<Cell> {
        let mut best: Option<Cell> = None;
        for (outer, outer_set, inner, inner_set) in [(a, a_set, b, b_set), (b, b_set, a, a_set)] {
            let Some(join_type) = self.graph.oriented_join_type(outer_set, inner_set) else {
                continue;
            };
            for &algorithm in self.algorithms() {
                let method = AccessMethod::Join {
                    algorithm,
                    join_type,
                    outer: outer_set,
                    inner: inner_set,
                };
                let eff = outer.effectiveness;
                let cost = outer.cost + inner.cost + self.estimate(subset, &method, eff);
                let cell = Cell {
                    cost,
                    ranked: cost + self.sort_penalty(subset, eff),
                    effectiveness: eff,
                    choice: Choice::Join {
                        outer: outer_set,
                        inner: inner_set,
                        algorithm,
                        join_type,
                    },
                    tie: (outer_set, algorithm, 0),
                };
                if best.as_ref().map_or(true, |b| cell.beats(b)) {
                    best = Some(cell);
                }
            }
        }
        best
    }

    fn dynamic_programming(&mut self) -> OptimizeResult<JoinPlan> {
        let n = self.graph.len();
        let all = bitset::full(n);
        let mut table: Vec<Option<Cell>> = vec![None; 1usize << n];

        // 按大小分桶，同一大小内按数值递增
        let mut by_size: Vec<Vec<NodeSet>> = vec![Vec::new(); n + 1];
        let mut subset = bitset::empty();
        loop {
            subset = bitset::next_subset(subset, all);
            if bitset::is_empty(subset) {
                break;
            }
            by_size[bitset::count(subset)].push(subset);
        }

        for node in 0..n {
            table[bitset::of(node) as usize] = Some(self.best_access(node)?);
        }

        for size in 2..=n {
            for &set in &by_size[size] {
                if !self.graph.is_connected(set) {
                    continue;
                }
                let low = bitset::min_subset(set);
                let rest = bitset::difference(set, low);
                let mut best: Option<Cell> = None;
                // 含最小元素的一侧作 left，每种拆分只看一次
                let mut sub = bitset::empty();
                loop {
                    let left = bitset::union(low, sub);
                    let right = bitset::difference(set, left);
                    if !bitset::is_empty(right) && self.graph.connects(left, right) {
                        if let (Some(l), Some(r)) = (table[left as usize], table[right as usize]) {
                            if let Some(cell) = self.best_join(set, &l, left, &r, right) {
                                if best.as_ref().map_or(true, |b| cell.beats(b)) {
                                    best = Some(cell);
                                }
                            }
                        }
                    }
                    if sub == rest {
                        break;
                    }
                    sub = bitset::next_subset(sub, rest);
                }
                if let Some(cell) = &best {
                    trace!(
                        "DP {} -> 代价 {:.3} ({})",
                        bitset::to_string(set, &self.names),
                        cell.ranked,
                        cell.effectiveness
                    );
                }
                table[set as usize] = best;
            }
        }

        let lookup = |set: NodeSet| table.get(set as usize).copied().flatten();
        self.finish(all, &lookup)
    }

    fn greedy(&mut self) -> OptimizeResult<JoinPlan> {
        let n = self.graph.len();
        let mut cells: HashMap<NodeSet, Cell> = HashMap::new();
        for node in 0..n {
            cells.insert(bitset::of(node), self.best_access(node)?);
        }

        let mut start: Option<(usize, Cell)> = None;
        for node in 0..n {
            let cell = cells[&bitset::of(node)];
            if start.as_ref().map_or(true, |(_, b)| cell.ranked < b.ranked) {
                start = Some((node, cell));
            }
        }
        let (first, mut current) = start.ok_or(OptimizeError::EmptyJoinGraph)?;
        let mut current_set = bitset::of(first);

        while current_set != bitset::full(n) {
            let frontier = bitset::difference(self.graph.neighbors_of(current_set), current_set);
            let mut best: Option<(NodeSet, Cell)> = None;
            for node in bitset::iter(frontier) {
                let single = bitset::of(node);
                let inner = cells[&single];
                let set = bitset::union(current_set, single);
                if let Some(cell) = self.best_join(set, &current, current_set, &inner, single) {
                    if best.as_ref().map_or(true, |(_, b)| cell.beats(b)) {
                        best = Some((set, cell));
                    }
                }
            }
            let Some((set, cell)) = best else {
                return Err(OptimizeError::NoPlanFound(format!(
                    "无法从 {} 继续扩展",
                    bitset::to_string(current_set, &self.names)
                )));
            };
            trace!(
                "贪心扩展 {} -> 代价 {:.3}",
                bitset::to_string(set, &self.names),
                cell.ranked
            );
            cells.insert(set, cell);
            current_set = set;
            current = cell;
        }

        let lookup = |set: NodeSet| cells.get(&set).copied();
        self.finish(current_set, &lookup)
    }

    /// 重建完整计划，需要时追加尾部排序
    fn finish(&mut self, all: NodeSet, lookup: &dyn Fn(NodeSet) -> Option<Cell>) -> OptimizeResult<JoinPlan> {
        let cell = lookup(all).ok_or_else(|| {
            OptimizeError::NoPlanFound(bitset::to_string(all, &self.names))
        })?;
        let plan = self.build_plan(all, lookup)?;
        if self.goal.need_sort(cell.effectiveness) {
            let fields = self.goal.sort_fields();
            let sort_cost = cell.ranked - cell.cost;
            return Ok(JoinPlan::Sort {
                fields,
                cost: cell.cost + sort_cost,
                input: Box::new(plan),
            });
        }
        Ok(plan)
    }

    fn build_plan(&self, set: NodeSet, lookup: &dyn Fn(NodeSet) -> Option<Cell>) -> OptimizeResult<JoinPlan> {
        let cell = lookup(set)
            .ok_or_else(|| OptimizeError::NoPlanFound(bitset::to_string(set, &self.names)))?;
        match cell.choice {
            Choice::Access { node, candidate } => {
                let graph_node = &self.graph.nodes()[node];
                Ok(JoinPlan::Access {
                    node,
                    name: graph_node.name.clone(),
                    method: graph_node.candidates[candidate].method.clone(),
                    effectiveness: cell.effectiveness,
                    cost: cell.cost,
                })
            }
            Choice::Join {
                outer,
                inner,
                algorithm,
                join_type,
            } => Ok(JoinPlan::Join {
                algorithm,
                join_type,
                nodes: set,
                effectiveness: cell.effectiveness,
                cost: cell.cost,
                outer: Box::new(self.build_plan(outer, lookup)?),
                inner: Box::new(self.build_plan(inner, lookup)?),
            }),
        }
    }
}
