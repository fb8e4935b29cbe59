//! WHERE 条件
//!
//! 条件只引用表的列（表 + 列位置），求值时通过行类型解析到具体字段下标，
//! 因此同一个条件可以作用于表行、扁平行或乘积行。
//! 比较遵循 SQL 语义：任一侧为 NULL 或两侧类型不可比较时结果为 false。

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::core::error::{RowError, RowResult};
use crate::core::row::Row;
use crate::core::schema::TableId;
use crate::core::value::Value;

/// 列引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnRef {
    pub table: TableId,
    pub position: usize,
}

impl ColumnRef {
    pub fn new(table: TableId, position: usize) -> Self {
        Self { table, position }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.position)
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
        }
    }

    /// 交换两侧操作数后的运算符（`a < b` ⇔ `b > a`）
    pub fn flip(&self) -> Comparison {
        match self {
            Comparison::Lt => Comparison::Gt,
            Comparison::Le => Comparison::Ge,
            Comparison::Gt => Comparison::Lt,
            Comparison::Ge => Comparison::Le,
            other => *other,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// WHERE 条件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    /// 列 op 常量
    Compare {
        column: ColumnRef,
        op: Comparison,
        value: Value,
    },
    /// 两列相等（连接条件）
    ColumnEquals { left: ColumnRef, right: ColumnRef },
    IsNull(ColumnRef),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn compare(column: ColumnRef, op: Comparison, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Eq, value)
    }

    /// 引用到的所有列
    pub fn columns(&self) -> Vec<ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<ColumnRef>) {
        match self {
            Condition::Compare { column, .. } | Condition::IsNull(column) => out.push(*column),
            Condition::ColumnEquals { left, right } => {
                out.push(*left);
                out.push(*right);
            }
            Condition::And(items) | Condition::Or(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
        }
    }

    /// 条件只涉及这些表时为 true
    pub fn only_references(&self, tables: &[TableId]) -> bool {
        self.columns().iter().all(|c| tables.contains(&c.table))
    }

    pub fn evaluate(&self, row: &Row) -> RowResult<bool> {
        match self {
            Condition::Compare { column, op, value } => {
                let actual = column_value(row, column)?;
                if actual.is_null() || value.is_null() {
                    return Ok(false);
                }
                Ok(actual
                    .compare_values(value)
                    .map(|ordering| op.matches(ordering))
                    .unwrap_or(false))
            }
            Condition::ColumnEquals { left, right } => {
                let l = column_value(row, left)?;
                let r = column_value(row, right)?;
                if l.is_null() || r.is_null() {
                    return Ok(false);
                }
                Ok(l.compare_values(r) == Some(Ordering::Equal))
            }
            Condition::IsNull(column) => Ok(column_value(row, column)?.is_null()),
            Condition::And(items) => {
                for item in items {
                    if !item.evaluate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(items) => {
                for item in items {
                    if item.evaluate(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

fn column_value<'a>(row: &'a Row, column: &ColumnRef) -> RowResult<&'a Value> {
    let index = row
        .row_type()
        .field_index(column)
        .ok_or_else(|| RowError::ColumnNotInRow {
            row_type: row.row_type().name().to_string(),
            column: column.to_string(),
        })?;
    row.value(index)
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { column, op, value } => {
                write!(f, "{} {} {}", column, op.symbol(), value)
            }
            Condition::ColumnEquals { left, right } => write!(f, "{} = {}", left, right),
            Condition::IsNull(column) => write!(f, "{} IS NULL", column),
            Condition::And(items) | Condition::Or(items) => {
                let sep = if matches!(self, Condition::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// 行谓词
///
/// 选择游标对谓词类型的每一行调用一次 `test`。
pub trait RowPredicate: Send {
    fn test(&self, row: &Row) -> RowResult<bool>;
}

impl RowPredicate for Condition {
    fn test(&self, row: &Row) -> RowResult<bool> {
        self.evaluate(row)
    }
}

impl<F> RowPredicate for F
where
    F: Fn(&Row) -> RowResult<bool> + Send,
{
    fn test(&self, row: &Row) -> RowResult<bool> {
        self(row)
    }
}
