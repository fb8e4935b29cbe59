//! Value 模块 - 标量值类型系统
//!
//! 此模块提供了查询核心使用的标量值类型，包括：
//! - 核心类型定义 (`types.rs`)
//! - 比较逻辑 (`comparison.rs`)：键排序用的全序，以及范围代数使用的“可比较性”判定

pub mod comparison;
pub mod types;

pub use types::*;
