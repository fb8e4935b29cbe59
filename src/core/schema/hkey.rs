//! 层次键（HKey）
//!
//! HKey 由从组根表到行所在表的各层段组成，每段为 (表序号, 该层键值)。
//! 按段逐一比较（先比较表序号，再比较键值），前缀排在更长的键之前，
//! 因此父行总是紧挨着出现在它的所有后代行之前。

use serde::Serialize;
use std::fmt;

use crate::core::value::Value;

/// HKey 的一段
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HKeySegment {
    /// 表在组内的先序序号
    pub ordinal: u32,
    /// 该层的键值
    pub values: Vec<Value>,
}

impl HKeySegment {
    pub fn new(ordinal: u32, values: Vec<Value>) -> Self {
        Self { ordinal, values }
    }
}

/// 层次键
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HKey {
    segments: Vec<HKeySegment>,
}

impl HKey {
    pub fn new(segments: Vec<HKeySegment>) -> Self {
        Self { segments }
    }

    /// 以根表段开始构建
    pub fn root(ordinal: u32, values: Vec<Value>) -> Self {
        Self {
            segments: vec![HKeySegment::new(ordinal, values)],
        }
    }

    /// 追加一层子表段
    pub fn child(mut self, ordinal: u32, values: Vec<Value>) -> Self {
        self.segments.push(HKeySegment::new(ordinal, values));
        self
    }

    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    /// 段数（即所在表的深度 + 1）
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last_ordinal(&self) -> Option<u32> {
        self.segments.last().map(|s| s.ordinal)
    }

    /// self 是否为 other 的前缀（包括相等）
    pub fn is_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// self 是否为 other 的真前缀
    pub fn is_strict_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() < other.segments.len() && self.is_prefix_of(other)
    }

    /// 截取前 depth 段
    pub fn prefix(&self, depth: usize) -> HKey {
        HKey {
            segments: self.segments[..depth.min(self.segments.len())].to_vec(),
        }
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:(", segment.ordinal)?;
            for (j, value) in segment.values.iter().enumerate() {
                if j > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", value)?;
            }
            f.write_str(")")?;
        }
        f.write_str("}")
    }
}
