//! 范围段
//!
//! 一个范围段是 [start, end] 区间（端点各自带包含性），下界总是有值的端点，
//! 上界可以是通配符。WHERE 条件先转成范围段列表，再经过 AND/OR 组合与排序合并
//! 得到索引扫描边界。

use std::fmt;

use log::warn;
use serde::Serialize;

use super::endpoint::{compare, try_cmp, ComparisonResult, RangeEndpoint};
use crate::core::expression::Comparison;
use crate::core::value::Value;

/// 范围段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSegment {
    pub start: RangeEndpoint,
    pub end: RangeEndpoint,
}

impl RangeSegment {
    /// 只包含 NULL
    pub const ONLY_NULL: RangeSegment = RangeSegment {
        start: RangeEndpoint::NULL_INCLUSIVE,
        end: RangeEndpoint::NULL_INCLUSIVE,
    };

    pub fn new(start: RangeEndpoint, end: RangeEndpoint) -> Self {
        Self { start, end }
    }

    /// 由 `列 op 常量` 得到的范围段
    ///
    /// 与 NULL 比较永远不成立，返回空列表；`<>` 拆成两段。
    pub fn from_comparison(op: Comparison, value: &Value) -> Vec<RangeSegment> {
        if value.is_null() {
            return Vec::new();
        }
        let v = value.clone();
        match op {
            Comparison::Eq => vec![RangeSegment::new(
                RangeEndpoint::inclusive(v.clone()),
                RangeEndpoint::inclusive(v),
            )],
            Comparison::Lt => vec![RangeSegment::new(
                RangeEndpoint::NULL_EXCLUSIVE,
                RangeEndpoint::exclusive(v),
            )],
            Comparison::Le => vec![RangeSegment::new(
                RangeEndpoint::NULL_EXCLUSIVE,
                RangeEndpoint::inclusive(v),
            )],
            Comparison::Gt => vec![RangeSegment::new(
                RangeEndpoint::exclusive(v),
                RangeEndpoint::UpperWild,
            )],
            Comparison::Ge => vec![RangeSegment::new(
                RangeEndpoint::inclusive(v),
                RangeEndpoint::UpperWild,
            )],
            Comparison::Ne => {
                let mut out = Self::from_comparison(Comparison::Lt, value);
                out.extend(Self::from_comparison(Comparison::Gt, value));
                out
            }
        }
    }

    /// 值是否落在段内；不可比较视为不在段内
    pub fn contains(&self, value: &Value) -> bool {
        let point = RangeEndpoint::inclusive(value.clone());
        let above_start = matches!(
            compare(&self.start, &point),
            ComparisonResult::Lt | ComparisonResult::Eq | ComparisonResult::LtBarely
        );
        // 点与排除上界同值时比较结果为 LtBarely，此时点不在段内
        let below_end = matches!(
            compare(&point, &self.end),
            ComparisonResult::Lt | ComparisonResult::Eq
        );
        above_start && below_end
    }

    /// 值是否已经越过段的上界
    ///
    /// 恰好落在排除上界上的值也算越过。
    pub fn is_below(&self, value: &Value) -> bool {
        let point = RangeEndpoint::inclusive(value.clone());
        matches!(
            compare(&point, &self.end),
            ComparisonResult::Gt | ComparisonResult::GtBarely | ComparisonResult::LtBarely
        )
    }
}

impl fmt::Display for RangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.start.value() {
            write!(f, "{} {} %", v, if self.start.is_inclusive() { "<=" } else { "<" })?;
        }
        if let Some(v) = self.end.value() {
            write!(f, " {} {}", if self.end.is_inclusive() { "<=" } else { "<" }, v)?;
        }
        Ok(())
    }
}

/// 判断 low 与 high 是否重叠
///
/// 值相等但包含性不同（BARELY）时按 `loose` 决定：比较前一段终点与后一段起点时取宽松，
/// 比较两个终点时取严格。BARELY 只表示"相接"，不会产生第三个切分点。
fn find_overlap(low: &RangeEndpoint, high: &RangeEndpoint, loose: bool) -> Option<bool> {
    match compare(low, high) {
        ComparisonResult::GtBarely => Some(loose),
        ComparisonResult::Eq => Some(low.is_inclusive()),
        ComparisonResult::LtBarely | ComparisonResult::Gt => Some(true),
        ComparisonResult::Lt => Some(false),
        ComparisonResult::Incomparable => None,
    }
}

/// 按起点排序并合并重叠或相接的段
///
/// 任意两个起点不可比较时返回 None，调用方放弃合并（保留原样或不使用该索引）。
pub fn sort_and_combine(mut segments: Vec<RangeSegment>) -> Option<Vec<RangeSegment>> {
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            if let Err(e) = try_cmp(&segments[i].start, &segments[j].start) {
                warn!("范围段排序失败: {}", e);
                return None;
            }
        }
    }
    segments.sort_by(|a, b| {
        try_cmp(&a.start, &b.start).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out: Vec<RangeSegment> = Vec::with_capacity(segments.len());
    for current in segments {
        let Some(previous) = out.last_mut() else {
            out.push(current);
            continue;
        };
        let starts_overlap = find_overlap(&previous.end, &current.start, true);
        match starts_overlap {
            None => {
                warn!("范围段 {} 与 {} 不可比较, 放弃合并", previous, current);
                return None;
            }
            Some(true) => match find_overlap(&previous.end, &current.end, false) {
                None => {
                    warn!("范围段 {} 与 {} 不可比较, 放弃合并", previous, current);
                    return None;
                }
                // 当前段完全落在前一段内
                Some(true) => {}
                Some(false) => previous.end = current.end,
            },
            Some(false) => out.push(current),
        }
    }
    Some(out)
}

/// 并集：简单拼接，由 `sort_and_combine` 负责合并
pub fn or_ranges(left: &[RangeSegment], right: &[RangeSegment]) -> Vec<RangeSegment> {
    left.iter().chain(right.iter()).cloned().collect()
}

/// 交集：两两求段交集，丢弃空段
pub fn and_ranges(left: &[RangeSegment], right: &[RangeSegment]) -> Vec<RangeSegment> {
    let mut out = Vec::new();
    for l in left {
        for r in right {
            if let Some(segment) = and_segment(l, r) {
                out.push(segment);
            }
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq)]
enum Pick {
    Min,
    Max,
}

/// 取两个端点中较紧的一个；值相等时排除性优先
fn pick_endpoint(one: &RangeEndpoint, two: &RangeEndpoint, pick: Pick) -> Option<RangeEndpoint> {
    if one.is_upper_wild() || two.is_upper_wild() {
        let one_wins = one.is_upper_wild() == (pick == Pick::Max);
        return Some(if one_wins { one.clone() } else { two.clone() });
    }
    let (v1, v2) = (one.value()?, two.value()?);
    let ordering = v1.compare_values(v2)?;
    let chosen = match (ordering, pick) {
        (std::cmp::Ordering::Less, Pick::Min) | (std::cmp::Ordering::Greater, Pick::Max) => one.clone(),
        (std::cmp::Ordering::Less, Pick::Max) | (std::cmp::Ordering::Greater, Pick::Min) => two.clone(),
        (std::cmp::Ordering::Equal, _) => RangeEndpoint::Bounded {
            value: v1.clone(),
            inclusive: one.is_inclusive() && two.is_inclusive(),
        },
    };
    Some(chosen)
}

/// 两段的交集；为空或不可比较时返回 None
pub fn and_segment(left: &RangeSegment, right: &RangeSegment) -> Option<RangeSegment> {
    let start = pick_endpoint(&left.start, &right.start, Pick::Max)?;
    let end = pick_endpoint(&left.end, &right.end, Pick::Min)?;
    match compare(&start, &end) {
        ComparisonResult::Lt => Some(RangeSegment::new(start, end)),
        ComparisonResult::Eq if start.is_inclusive() => Some(RangeSegment::new(start, end)),
        _ => None,
    }
}
