//! 行
//!
//! 行是封闭的枚举：表行、扁平行、乘积行、VALUES 行。所有构造函数都在构造时校验形状
//! （字段数、输入行类型、运行时值类型），形状错误不会延迟到第一次读取。
//! 字段读取与 `contains_real_row_of` 都是 O(1) 的下标运算。

use std::fmt;
use std::sync::Arc;

use crate::core::error::{RowError, RowResult};
use crate::core::schema::{HKey, RowType, TableId};
use crate::core::value::Value;

mod compound;

pub use compound::{FlattenedRow, ProductRow};
pub(crate) use compound::null_child_hkey;

/// 共享的行引用
pub type RowRef = Arc<Row>;

static NULL: Value = Value::Null;

/// 检查值列表是否符合行类型
fn check_values<'a>(
    row_type: &RowType,
    values: impl ExactSizeIterator<Item = &'a Value>,
) -> RowResult<()> {
    if values.len() != row_type.n_fields() {
        return Err(RowError::FieldCountMismatch {
            row_type: row_type.name().to_string(),
            expected: row_type.n_fields(),
            actual: values.len(),
        });
    }
    for (index, (value, field_type)) in values.zip(row_type.fields().iter()).enumerate() {
        if !field_type.accepts(value) {
            return Err(RowError::FieldTypeMismatch {
                row_type: row_type.name().to_string(),
                index,
                expected: field_type.to_string(),
                actual: value.type_name().to_string(),
            });
        }
    }
    Ok(())
}

/// 存储表中的一行
#[derive(Debug, Clone)]
pub struct TableRow {
    row_type: Arc<RowType>,
    hkey: HKey,
    values: Vec<Value>,
}

impl TableRow {
    pub fn new(row_type: Arc<RowType>, hkey: HKey, values: Vec<Value>) -> RowResult<Self> {
        let label = match row_type.hierarchy_label() {
            Some(label) if row_type.is_table_type() => label,
            _ => {
                return Err(RowError::WrongKind(format!(
                    "{} 不是表行类型",
                    row_type.name()
                )))
            }
        };
        if hkey.depth() != label.depth + 1 || hkey.last_ordinal() != Some(label.ordinal) {
            return Err(RowError::HKeyMismatch {
                row_type: row_type.name().to_string(),
                left: hkey.to_string(),
                right: format!("表序号 {} 深度 {}", label.ordinal, label.depth),
            });
        }
        check_values(&row_type, values.iter())?;
        Ok(Self {
            row_type,
            hkey,
            values,
        })
    }

    pub fn table(&self) -> Option<TableId> {
        self.row_type.table()
    }
}

/// 常量行
#[derive(Debug, Clone)]
pub struct ValuesRow {
    row_type: Arc<RowType>,
    values: Vec<Value>,
}

impl ValuesRow {
    pub fn new(row_type: Arc<RowType>, values: Vec<Value>) -> RowResult<Self> {
        check_values(&row_type, values.iter())?;
        Ok(Self { row_type, values })
    }
}

/// 行
#[derive(Debug, Clone)]
pub enum Row {
    Table(TableRow),
    Flattened(FlattenedRow),
    Product(ProductRow),
    Values(ValuesRow),
}

impl Row {
    pub fn row_type(&self) -> &Arc<RowType> {
        match self {
            Row::Table(r) => &r.row_type,
            Row::Flattened(r) => r.row_type(),
            Row::Product(r) => r.row_type(),
            Row::Values(r) => &r.row_type,
        }
    }

    pub fn n_fields(&self) -> usize {
        self.row_type().n_fields()
    }

    /// 读取第 index 个字段
    ///
    /// 扁平行缺失一侧的字段读作 NULL。
    pub fn value(&self, index: usize) -> RowResult<&Value> {
        let n_fields = self.n_fields();
        if index >= n_fields {
            return Err(RowError::FieldIndexOutOfRange {
                row_type: self.row_type().name().to_string(),
                index,
                n_fields,
            });
        }
        match self {
            Row::Table(r) => Ok(&r.values[index]),
            Row::Values(r) => Ok(&r.values[index]),
            Row::Flattened(r) => r.value(index),
            Row::Product(r) => r.value(index),
        }
    }

    /// 全部字段值
    pub fn values(&self) -> RowResult<Vec<Value>> {
        (0..self.n_fields())
            .map(|i| self.value(i).cloned())
            .collect()
    }

    /// 行的 HKey；VALUES 行没有 HKey
    pub fn hkey(&self) -> Option<&HKey> {
        match self {
            Row::Table(r) => Some(&r.hkey),
            Row::Flattened(r) => r.hkey(),
            Row::Product(r) => r.hkey(),
            Row::Values(_) => None,
        }
    }

    /// 行中是否包含某张表的真实行
    pub fn contains_real_row_of(&self, table: TableId) -> bool {
        match self {
            Row::Table(r) => r.table() == Some(table),
            Row::Flattened(r) => r.contains_real_row_of(table),
            Row::Product(r) => r.contains_real_row_of(table),
            Row::Values(_) => false,
        }
    }

    /// self 是否为 other 的祖先行（HKey 真前缀）
    pub fn ancestor_of(&self, other: &Row) -> bool {
        match (self.hkey(), other.hkey()) {
            (Some(a), Some(b)) => a.is_strict_prefix_of(b),
            _ => false,
        }
    }

    pub(crate) fn null() -> &'static Value {
        &NULL
    }
}

impl From<TableRow> for Row {
    fn from(row: TableRow) -> Self {
        Row::Table(row)
    }
}

impl From<ValuesRow> for Row {
    fn from(row: ValuesRow) -> Self {
        Row::Values(row)
    }
}

impl From<FlattenedRow> for Row {
    fn from(row: FlattenedRow) -> Self {
        Row::Flattened(row)
    }
}

impl From<ProductRow> for Row {
    fn from(row: ProductRow) -> Self {
        Row::Product(row)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.row_type().name())?;
        for i in 0..self.n_fields() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match self.value(i) {
                Ok(v) => write!(f, "{}", v)?,
                Err(_) => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{FieldDef, SchemaBuilder};
    use crate::core::value::{DataType, FieldType};

    fn schema() -> (crate::core::schema::Schema, TableId) {
        let mut b = SchemaBuilder::new(1);
        let customer = b
            .root_table(
                "customer",
                vec![
                    FieldDef::new("cid", FieldType::not_null(DataType::Int32)),
                    FieldDef::new("name", FieldType::nullable(DataType::String)),
                ],
                vec![0],
            )
            .unwrap();
        (b.build().unwrap(), customer)
    }

    #[test]
    fn test_table_row_validates_shape() {
        let (schema, customer) = schema();
        let t = schema.table_type(customer).unwrap();
        let key = HKey::root(0, vec![Value::Int32(1)]);

        let ok = TableRow::new(t.clone(), key.clone(), vec![Value::Int32(1), Value::Null]);
        assert!(ok.is_ok());

        let short = TableRow::new(t.clone(), key.clone(), vec![Value::Int32(1)]);
        assert!(matches!(short, Err(RowError::FieldCountMismatch { .. })));

        let wrong = TableRow::new(t, key, vec![Value::from("x"), Value::Null]);
        assert!(matches!(
            wrong,
            Err(RowError::FieldTypeMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_table_row_rejects_foreign_hkey() {
        let (schema, customer) = schema();
        let t = schema.table_type(customer).unwrap();
        let key = HKey::root(0, vec![Value::Int32(1)]).child(1, vec![Value::Int32(2)]);
        let err = TableRow::new(t, key, vec![Value::Int32(1), Value::Null]).unwrap_err();
        assert!(matches!(err, RowError::HKeyMismatch { .. }));
    }

    #[test]
    fn test_values_row() {
        let (schema, customer) = schema();
        let vt = schema.new_values_type(vec![FieldType::not_null(DataType::Int64)]);
        let row: Row = ValuesRow::new(vt, vec![Value::Int64(3)]).unwrap().into();
        assert_eq!(row.value(0).unwrap(), &Value::Int64(3));
        assert!(row.hkey().is_none());
        assert!(!row.contains_real_row_of(customer));
        assert!(row.value(1).is_err());
    }
}
