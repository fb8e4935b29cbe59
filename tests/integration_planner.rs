//! 规划阶段集成测试
//!
//! 测试范围:
//! - 索引候选的顺序有效性与排序消除
//! - 查询目标的安装与下游流水线
//! - 连接图的可行性检查
//! - DP 与贪心的切换、EXPLAIN 输出

use std::sync::Arc;

use groupdb::config::Config;
use groupdb::core::error::OptimizeError;
use groupdb::core::expression::{ColumnRef, Condition};
use groupdb::core::schema::TableId;
use groupdb::query::optimizer::goal::{AggregateImplementation, AggregateNode, LimitNode, SortNode};
use groupdb::query::optimizer::join::bitset::{self, NodeSet};
use groupdb::query::optimizer::{
    AccessCandidate, AccessMethod, CostCalculator, CostModelConfig, IndexOrdering, JoinGraph,
    JoinNode, JoinOrderOptimizer, JoinType, OptimizationMethod, OptimizerConfig, OrderByColumn,
    OrderEffectiveness, PlanNode, QueryIndexGoal,
};

const CUSTOMER: TableId = TableId(0);
const ORDER: TableId = TableId(1);
const ITEM: TableId = TableId(2);
const ADDRESS: TableId = TableId(3);

fn order_date() -> ColumnRef {
    ColumnRef::new(ORDER, 2)
}

/// ORDER BY order_date LIMIT 10
fn sorted_goal() -> QueryIndexGoal {
    QueryIndexGoal::new(
        vec![],
        None,
        Some(SortNode::new(vec![OrderByColumn::asc(order_date())])),
        None,
        Some(LimitNode::constant(10, 0)),
    )
    .unwrap()
}

/// 组扫描 100，索引扫描 index_cost，排序 200，连接 10
fn estimator(
    index_cost: f64,
) -> impl Fn(NodeSet, &AccessMethod, OrderEffectiveness) -> f64 + Send + Sync {
    move |_: NodeSet, method: &AccessMethod, _: OrderEffectiveness| match method {
        AccessMethod::GroupScan { .. } => 100.0,
        AccessMethod::IndexScan { .. } => index_cost,
        AccessMethod::Sort { .. } => 200.0,
        AccessMethod::Join { .. } => 10.0,
    }
}

fn single_order_graph(goal: &QueryIndexGoal) -> JoinGraph {
    let mut ordering = IndexOrdering::new(vec![OrderByColumn::asc(order_date())]);
    let index = AccessCandidate::index_scan(ORDER, "order_date", goal, &mut ordering);
    assert_eq!(index.effectiveness, OrderEffectiveness::Sorted);
    let mut graph = JoinGraph::new();
    graph.add_node(JoinNode::new(
        "order",
        vec![AccessCandidate::group_scan(ORDER), index],
    ));
    graph
}

fn customer_edge(graph: &mut JoinGraph, customer: usize, child: usize, table: TableId) {
    graph
        .add_edge(
            customer,
            child,
            JoinType::Inner,
            vec![Condition::ColumnEquals {
                left: ColumnRef::new(CUSTOMER, 0),
                right: ColumnRef::new(table, 1),
            }],
        )
        .unwrap();
}

#[test]
fn test_sorted_index_eliminates_sort() {
    let mut goal = sorted_goal();
    let graph = single_order_graph(&goal);
    let optimizer = JoinOrderOptimizer::new(Arc::new(estimator(150.0)));
    let result = optimizer.optimize_join_order(&graph, &goal).unwrap();

    assert!(!result.plan.has_sort());
    assert_eq!(result.plan.effectiveness(), OrderEffectiveness::Sorted);
    assert_eq!(result.cost, 150.0);

    goal.install_order_effectiveness(result.plan.effectiveness())
        .unwrap();
    let pipeline = goal.pipeline();
    assert_eq!(pipeline.len(), 1);
    assert!(matches!(pipeline[0], PlanNode::Limit(_)));

    let again = goal.install_order_effectiveness(OrderEffectiveness::None);
    assert!(matches!(
        again,
        Err(OptimizeError::OrderEffectivenessAlreadyInstalled)
    ));
}

#[test]
fn test_expensive_index_keeps_sort() {
    let mut goal = sorted_goal();
    let graph = single_order_graph(&goal);
    let optimizer = JoinOrderOptimizer::new(Arc::new(estimator(1000.0)));
    let result = optimizer.optimize_join_order(&graph, &goal).unwrap();

    assert!(result.plan.has_sort());
    assert_eq!(result.cost, 300.0);
    // 安装的是访问路径的有效性，不是排序之后的
    assert_eq!(result.plan.effectiveness(), OrderEffectiveness::None);

    goal.install_order_effectiveness(result.plan.effectiveness())
        .unwrap();
    let names: Vec<&str> = goal.pipeline().iter().map(|n| n.name()).collect();
    assert_eq!(names.len(), 2);
    assert!(matches!(goal.pipeline()[0], PlanNode::Sort(_)));
}

#[test]
fn test_grouping_goal_with_partial_index() {
    // GROUP BY cid, order_date；索引只覆盖 order_date
    let cid = ColumnRef::new(ORDER, 1);
    let mut goal = QueryIndexGoal::new(
        vec![],
        Some(AggregateNode::new(vec![cid, order_date()])),
        None,
        None,
        None,
    )
    .unwrap();
    let mut ordering = IndexOrdering::new(vec![OrderByColumn::asc(order_date())]);
    let candidate = AccessCandidate::index_scan(ORDER, "order_date", &goal, &mut ordering);
    assert_eq!(candidate.effectiveness, OrderEffectiveness::PartialGrouped);
    assert!(goal.need_sort(candidate.effectiveness));

    goal.install_order_effectiveness(candidate.effectiveness)
        .unwrap();
    match &goal.pipeline()[0] {
        PlanNode::Aggregate(node) => assert_eq!(
            node.implementation,
            AggregateImplementation::PreaggregateResort
        ),
        other => panic!("期望聚合节点, 实际为 {:?}", other),
    }
}

#[test]
fn test_group_join_order() {
    let mut graph = JoinGraph::new();
    let c = graph.add_node(JoinNode::new("customer", vec![AccessCandidate::group_scan(CUSTOMER)]));
    let o = graph.add_node(JoinNode::new("order", vec![AccessCandidate::group_scan(ORDER)]));
    let a = graph.add_node(JoinNode::new("address", vec![AccessCandidate::group_scan(ADDRESS)]));
    customer_edge(&mut graph, c, o, ORDER);
    customer_edge(&mut graph, c, a, ADDRESS);

    let calculator = CostCalculator::new(CostModelConfig::default(), vec![100, 1000, 150]);
    let optimizer = JoinOrderOptimizer::new(Arc::new(calculator));
    let result = optimizer
        .optimize_join_order(&graph, &QueryIndexGoal::default())
        .unwrap();

    assert_eq!(result.method, OptimizationMethod::DynamicProgramming);
    assert_eq!(result.plan.nodes(), bitset::full(3));
    let mut order = result.plan.join_order();
    order.sort();
    assert_eq!(order, vec!["address", "customer", "order"]);
    assert!(result.cost_calls > 0);
}

#[test]
fn test_disconnected_graph_rejected() {
    let mut graph = JoinGraph::new();
    graph.add_node(JoinNode::new("customer", vec![AccessCandidate::group_scan(CUSTOMER)]));
    graph.add_node(JoinNode::new("item", vec![AccessCandidate::group_scan(ITEM)]));
    let optimizer = JoinOrderOptimizer::new(Arc::new(estimator(100.0)));
    let err = optimizer
        .optimize_join_order(&graph, &QueryIndexGoal::default())
        .unwrap_err();
    assert!(matches!(err, OptimizeError::DisconnectedJoinGraph { .. }));
}

#[test]
fn test_too_many_tables_rejected() {
    let mut graph = JoinGraph::new();
    for i in 0..65 {
        graph.add_node(JoinNode::new(
            format!("t{}", i),
            vec![AccessCandidate::group_scan(TableId(i))],
        ));
    }
    let optimizer = JoinOrderOptimizer::new(Arc::new(estimator(100.0)));
    let err = optimizer
        .optimize_join_order(&graph, &QueryIndexGoal::default())
        .unwrap_err();
    assert_eq!(err, OptimizeError::TooManyTables { count: 65, limit: 64 });
}

#[test]
fn test_config_drives_greedy_fallback() {
    let config = Config::from_toml_str(
        r#"
[optimizer]
dp_threshold = 2
trace_plans = true
"#,
    )
    .unwrap();

    let mut graph = JoinGraph::new();
    let c = graph.add_node(JoinNode::new("customer", vec![AccessCandidate::group_scan(CUSTOMER)]));
    let o = graph.add_node(JoinNode::new("order", vec![AccessCandidate::group_scan(ORDER)]));
    let a = graph.add_node(JoinNode::new("address", vec![AccessCandidate::group_scan(ADDRESS)]));
    let i = graph.add_node(JoinNode::new("item", vec![AccessCandidate::group_scan(ITEM)]));
    customer_edge(&mut graph, c, o, ORDER);
    customer_edge(&mut graph, c, a, ADDRESS);
    graph
        .add_edge(
            o,
            i,
            JoinType::Inner,
            vec![Condition::ColumnEquals {
                left: ColumnRef::new(ORDER, 0),
                right: ColumnRef::new(ITEM, 1),
            }],
        )
        .unwrap();

    let calculator = CostCalculator::new(CostModelConfig::default(), vec![100, 1000, 150, 5000]);
    let optimizer =
        JoinOrderOptimizer::new(Arc::new(calculator)).with_config(OptimizerConfig::from(&config));
    let result = optimizer
        .optimize_join_order(&graph, &QueryIndexGoal::default())
        .unwrap();
    assert_eq!(result.method, OptimizationMethod::Greedy);
    assert_eq!(result.plan.nodes(), bitset::full(4));
    assert_eq!(result.plan.join_order().len(), 4);
}

#[test]
fn test_explain_json() {
    let goal = sorted_goal();
    let graph = single_order_graph(&goal);
    let optimizer = JoinOrderOptimizer::new(Arc::new(estimator(150.0)));
    let result = optimizer.optimize_join_order(&graph, &goal).unwrap();
    let json = result.plan.explain_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["op"], "Access");
    assert!(json.contains("IndexScan"));
    assert!(json.contains("order_date"));
}
