//! 单列范围推导
//!
//! 从 WHERE 条件列表中找出约束某一列的比较，组合成排好序、合并过的范围段，
//! 作为该列上索引扫描的边界。

use std::fmt;

use log::trace;

use super::segment::{and_ranges, or_ranges, sort_and_combine, RangeSegment};
use crate::core::expression::{ColumnRef, Condition};
use crate::core::value::Value;

/// 某一列的扫描范围
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRanges {
    column: ColumnRef,
    segments: Vec<RangeSegment>,
}

impl ColumnRanges {
    /// 由条件列表（隐式 AND）推导列范围
    ///
    /// 没有任何条件约束该列，或者范围段之间不可比较时返回 None。
    /// 返回的段列表可能为空，表示条件不可满足。
    pub fn from_conditions(column: ColumnRef, conditions: &[Condition]) -> Option<ColumnRanges> {
        let mut result: Option<Vec<RangeSegment>> = None;
        for condition in conditions {
            if let Some(segments) = segments_of(column, condition) {
                result = Some(match result {
                    None => segments,
                    Some(previous) => and_ranges(&previous, &segments),
                });
            }
        }
        let segments = sort_and_combine(result?)?;
        trace!("列 {} 的扫描范围: {} 段", column, segments.len());
        Some(ColumnRanges { column, segments })
    }

    pub fn column(&self) -> ColumnRef {
        self.column
    }

    pub fn segments(&self) -> &[RangeSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<RangeSegment> {
        self.segments
    }

    /// 条件不可满足
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.segments.iter().any(|s| s.contains(value))
    }
}

impl fmt::Display for ColumnRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.column)?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" OR ")?;
            }
            write!(f, "[{}]", segment)?;
        }
        Ok(())
    }
}

/// 单个条件对该列的约束；条件不约束该列时返回 None
fn segments_of(column: ColumnRef, condition: &Condition) -> Option<Vec<RangeSegment>> {
    match condition {
        Condition::Compare {
            column: c,
            op,
            value,
        } if *c == column => Some(RangeSegment::from_comparison(*op, value)),
        Condition::IsNull(c) if *c == column => Some(vec![RangeSegment::ONLY_NULL]),
        Condition::And(items) => {
            let mut result: Option<Vec<RangeSegment>> = None;
            for item in items {
                if let Some(segments) = segments_of(column, item) {
                    result = Some(match result {
                        None => segments,
                        Some(previous) => and_ranges(&previous, &segments),
                    });
                }
            }
            result
        }
        // 只有每个分支都约束该列时，OR 才能收窄范围
        Condition::Or(items) => {
            let mut result = Vec::new();
            for item in items {
                result = or_ranges(&result, &segments_of(column, item)?);
            }
            Some(result)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::Comparison;
    use crate::core::schema::TableId;
    use crate::query::optimizer::range::RangeEndpoint;

    fn col() -> ColumnRef {
        ColumnRef::new(TableId(0), 1)
    }

    #[test]
    fn test_between_is_one_segment() {
        let ranges = ColumnRanges::from_conditions(
            col(),
            &[
                Condition::compare(col(), Comparison::Ge, 10),
                Condition::compare(col(), Comparison::Lt, 20),
                Condition::eq(ColumnRef::new(TableId(0), 0), 1),
            ],
        )
        .unwrap();
        assert_eq!(
            ranges.segments(),
            &[RangeSegment::new(
                RangeEndpoint::inclusive(10),
                RangeEndpoint::exclusive(20)
            )]
        );
        assert!(ranges.contains(&Value::Int64(19)));
        assert!(!ranges.contains(&Value::Int32(20)));
    }

    #[test]
    fn test_or_of_points_is_sorted() {
        let ranges = ColumnRanges::from_conditions(
            col(),
            &[Condition::Or(vec![
                Condition::eq(col(), 7),
                Condition::eq(col(), 3),
                Condition::eq(col(), 7),
            ])],
        )
        .unwrap();
        assert_eq!(ranges.segments().len(), 2);
        assert_eq!(ranges.segments()[0].start, RangeEndpoint::inclusive(3));
    }

    #[test]
    fn test_or_with_unrelated_branch_does_not_constrain() {
        let other = ColumnRef::new(TableId(0), 0);
        let ranges = ColumnRanges::from_conditions(
            col(),
            &[Condition::Or(vec![Condition::eq(col(), 7), Condition::eq(other, 3)])],
        );
        assert!(ranges.is_none());
    }

    #[test]
    fn test_contradiction_is_empty() {
        let ranges = ColumnRanges::from_conditions(
            col(),
            &[
                Condition::compare(col(), Comparison::Gt, 5),
                Condition::compare(col(), Comparison::Lt, 5),
            ],
        )
        .unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_is_null() {
        let ranges = ColumnRanges::from_conditions(col(), &[Condition::IsNull(col())]).unwrap();
        assert!(ranges.contains(&Value::Null));
        assert!(!ranges.contains(&Value::Int32(0)));
    }
}
