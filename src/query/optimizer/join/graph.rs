//! 连接图
//!
//! 节点是参与连接的表（带若干候选访问方式），边是连接条件。
//! 邻接关系同时保存为位图，连通性判断与跨子集的边检测都是字运算。

use serde::Serialize;

use super::bitset::{self, NodeSet};
use super::plan::{AccessCandidate, JoinType};
use crate::core::error::{OptimizeError, OptimizeResult};
use crate::core::expression::Condition;

/// 连接图节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinNode {
    pub name: String,
    pub candidates: Vec<AccessCandidate>,
}

impl JoinNode {
    pub fn new(name: impl Into<String>, candidates: Vec<AccessCandidate>) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }
}

/// 连接边；left/right 给出声明方向，非 INNER 连接依赖方向
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinEdge {
    pub left: usize,
    pub right: usize,
    pub join_type: JoinType,
    pub conditions: Vec<Condition>,
}

/// 连接图
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    nodes: Vec<JoinNode>,
    edges: Vec<JoinEdge>,
    neighbors: Vec<NodeSet>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点，返回节点下标
    pub fn add_node(&mut self, node: JoinNode) -> usize {
        self.nodes.push(node);
        self.neighbors.push(bitset::empty());
        self.nodes.len() - 1
    }

    pub fn add_edge(
        &mut self,
        left: usize,
        right: usize,
        join_type: JoinType,
        conditions: Vec<Condition>,
    ) -> OptimizeResult<usize> {
        if left >= self.nodes.len() || right >= self.nodes.len() {
            return Err(OptimizeError::InvalidEdge(format!(
                "节点下标越界: {} - {} (共 {} 个节点)",
                left,
                right,
                self.nodes.len()
            )));
        }
        if left == right {
            return Err(OptimizeError::InvalidEdge(format!(
                "自环: {}",
                self.nodes[left].name
            )));
        }
        if left < bitset::CAPACITY && right < bitset::CAPACITY {
            self.neighbors[left] |= bitset::of(right);
            self.neighbors[right] |= bitset::of(left);
        }
        self.edges.push(JoinEdge {
            left,
            right,
            join_type,
            conditions,
        });
        Ok(self.edges.len() - 1)
    }

    pub fn nodes(&self) -> &[JoinNode] {
        &self.nodes
    }

    pub fn node(&self, i: usize) -> Option<&JoinNode> {
        self.nodes.get(i)
    }

    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// 与集合中任一节点相邻的节点
    pub fn neighbors_of(&self, set: NodeSet) -> NodeSet {
        bitset::iter(set)
            .filter_map(|i| self.neighbors.get(i))
            .fold(bitset::empty(), |acc, n| bitset::union(acc, *n))
    }

    /// 两个不相交子集之间是否有边
    pub fn connects(&self, a: NodeSet, b: NodeSet) -> bool {
        bitset::overlaps(self.neighbors_of(a), b)
    }

    /// 在 within 内从 start 出发可达的节点
    pub fn reachable(&self, start: usize, within: NodeSet) -> NodeSet {
        let mut reached = bitset::intersection(bitset::of(start), within);
        let mut frontier = reached;
        while !bitset::is_empty(frontier) {
            let next = bitset::difference(
                bitset::intersection(self.neighbors_of(frontier), within),
                reached,
            );
            reached = bitset::union(reached, next);
            frontier = next;
        }
        reached
    }

    /// 子集是否构成连通子图
    pub fn is_connected(&self, set: NodeSet) -> bool {
        match bitset::min(set) {
            None => false,
            Some(start) => self.reachable(start, set) == set,
        }
    }

    /// outer 作外侧、inner 作内侧时的连接类型
    ///
    /// 方向不被允许时返回 None：SEMI 只能按声明方向求值，
    /// 多条跨越的边要求互相冲突的外连接时也返回 None。
    pub fn oriented_join_type(&self, outer: NodeSet, inner: NodeSet) -> Option<JoinType> {
        let mut result = JoinType::Inner;
        for edge in &self.edges {
            let forward = bitset::contains(outer, edge.left) && bitset::contains(inner, edge.right);
            let backward = bitset::contains(outer, edge.right) && bitset::contains(inner, edge.left);
            let oriented = if forward {
                edge.join_type
            } else if backward {
                edge.join_type.commuted()?
            } else {
                continue;
            };
            if oriented == JoinType::Inner {
                continue;
            }
            if result != JoinType::Inner && result != oriented {
                return None;
            }
            result = oriented;
        }
        Some(result)
    }

    /// 两个子集之间的连接条件
    pub fn conditions_between(&self, a: NodeSet, b: NodeSet) -> Vec<&Condition> {
        self.edges
            .iter()
            .filter(|e| {
                (bitset::contains(a, e.left) && bitset::contains(b, e.right))
                    || (bitset::contains(a, e.right) && bitset::contains(b, e.left))
            })
            .flat_map(|e| e.conditions.iter())
            .collect()
    }
}
