//! 范围代数
//!
//! 把 WHERE 条件中的比较转换为索引扫描边界：
//! - `endpoint`：端点与带 BARELY 的端点比较
//! - `segment`：范围段、交并运算与排序合并
//! - `column_ranges`：单列范围推导

pub mod column_ranges;
pub mod endpoint;
pub mod segment;

pub use column_ranges::ColumnRanges;
pub use endpoint::{compare, max, min, try_cmp, ComparisonResult, RangeEndpoint};
pub use segment::{and_ranges, and_segment, or_ranges, sort_and_combine, RangeSegment};
