//! 范围端点
//!
//! 端点是 (值, 是否包含) 或"上方无界"通配符。端点比较在值相等而包含性不同时给出
//! BARELY 结果而不是相等，合并相邻的半开区间依赖这一点。
//! 不可比较的端点（类型不兼容）绝不会被当作相等。

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::core::error::{RangeError, RangeResult};
use crate::core::value::Value;

/// 范围端点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RangeEndpoint {
    Bounded { value: Value, inclusive: bool },
    /// 上方无界
    UpperWild,
}

/// 端点比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComparisonResult {
    Lt,
    /// 值相等，只因包含性不同而较小
    LtBarely,
    Gt,
    /// 值相等，只因包含性不同而较大
    GtBarely,
    Eq,
    Incomparable,
}

impl ComparisonResult {
    /// BARELY 归一化为 LT/GT
    pub fn normalize(self) -> ComparisonResult {
        match self {
            ComparisonResult::LtBarely => ComparisonResult::Lt,
            ComparisonResult::GtBarely => ComparisonResult::Gt,
            other => other,
        }
    }
}

impl RangeEndpoint {
    /// 包含 NULL 的下界
    pub const NULL_INCLUSIVE: RangeEndpoint = RangeEndpoint::Bounded {
        value: Value::Null,
        inclusive: true,
    };

    /// 排除 NULL 的下界（所有非空值）
    pub const NULL_EXCLUSIVE: RangeEndpoint = RangeEndpoint::Bounded {
        value: Value::Null,
        inclusive: false,
    };

    pub fn inclusive(value: impl Into<Value>) -> Self {
        RangeEndpoint::Bounded {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<Value>) -> Self {
        RangeEndpoint::Bounded {
            value: value.into(),
            inclusive: false,
        }
    }

    pub fn wildcard_above() -> Self {
        RangeEndpoint::UpperWild
    }

    pub fn is_upper_wild(&self) -> bool {
        matches!(self, RangeEndpoint::UpperWild)
    }

    /// 通配符视为包含
    pub fn is_inclusive(&self) -> bool {
        match self {
            RangeEndpoint::Bounded { inclusive, .. } => *inclusive,
            RangeEndpoint::UpperWild => true,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            RangeEndpoint::Bounded { value, .. } => Some(value),
            RangeEndpoint::UpperWild => None,
        }
    }
}

impl fmt::Display for RangeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEndpoint::Bounded { value, inclusive } => {
                write!(f, "{}{}", value, if *inclusive { " (incl)" } else { " (excl)" })
            }
            RangeEndpoint::UpperWild => f.write_str("*"),
        }
    }
}

/// 比较两个端点
pub fn compare(a: &RangeEndpoint, b: &RangeEndpoint) -> ComparisonResult {
    let (va, ia, vb, ib) = match (a, b) {
        (RangeEndpoint::UpperWild, RangeEndpoint::UpperWild) => return ComparisonResult::Eq,
        (RangeEndpoint::UpperWild, _) => return ComparisonResult::Gt,
        (_, RangeEndpoint::UpperWild) => return ComparisonResult::Lt,
        (
            RangeEndpoint::Bounded {
                value: va,
                inclusive: ia,
            },
            RangeEndpoint::Bounded {
                value: vb,
                inclusive: ib,
            },
        ) => (va, *ia, vb, *ib),
    };
    match va.compare_values(vb) {
        None => ComparisonResult::Incomparable,
        Some(Ordering::Less) => ComparisonResult::Lt,
        Some(Ordering::Greater) => ComparisonResult::Gt,
        Some(Ordering::Equal) if ia == ib => ComparisonResult::Eq,
        Some(Ordering::Equal) if ia => ComparisonResult::LtBarely,
        Some(Ordering::Equal) => ComparisonResult::GtBarely,
    }
}

/// 较小的端点；不可比较时返回 None，由调用方按"不可合并"保守处理
pub fn min<'a>(a: &'a RangeEndpoint, b: &'a RangeEndpoint) -> Option<&'a RangeEndpoint> {
    match compare(a, b).normalize() {
        ComparisonResult::Lt | ComparisonResult::Eq => Some(a),
        ComparisonResult::Gt => Some(b),
        _ => None,
    }
}

/// 较大的端点；不可比较时返回 None
pub fn max<'a>(a: &'a RangeEndpoint, b: &'a RangeEndpoint) -> Option<&'a RangeEndpoint> {
    match compare(a, b).normalize() {
        ComparisonResult::Gt | ComparisonResult::Eq => Some(a),
        ComparisonResult::Lt => Some(b),
        _ => None,
    }
}

/// 需要全序的场合使用的比较，不可比较时报错
pub fn try_cmp(a: &RangeEndpoint, b: &RangeEndpoint) -> RangeResult<Ordering> {
    match compare(a, b).normalize() {
        ComparisonResult::Lt => Ok(Ordering::Less),
        ComparisonResult::Gt => Ok(Ordering::Greater),
        ComparisonResult::Eq => Ok(Ordering::Equal),
        _ => Err(RangeError::illegal(a, b)),
    }
}
