//! 组合行：扁平行与乘积行
//!
//! 组合行不复制字段，只持有两个输入行并把字段下标映射到对应输入。

use std::sync::Arc;

use super::{Row, RowRef};
use crate::core::error::{RowError, RowResult};
use crate::core::schema::{HKey, RowType, RowTypeKind, TableId};
use crate::core::value::Value;

fn input_mismatch(row_type: &RowType, side: &'static str, expected: &RowType, actual: &Row) -> RowError {
    RowError::InputTypeMismatch {
        row_type: row_type.name().to_string(),
        side,
        expected: expected.name().to_string(),
        actual: actual.row_type().name().to_string(),
    }
}

/// 扁平行：祖先行 + 共享 HKey 前缀的后代行
///
/// 两侧至少存在一侧。缺失的一侧（孤儿子行没有父行，或父行没有子行）字段读作 NULL。
#[derive(Debug, Clone)]
pub struct FlattenedRow {
    row_type: Arc<RowType>,
    parent: Option<RowRef>,
    child: Option<RowRef>,
    parent_fields: usize,
    /// 子侧缺失时的 HKey：父行 HKey 追加一个键值全为 NULL 的子表段
    null_child_hkey: Option<HKey>,
}

/// 父行 HKey 追加子表段（键值全为 NULL）
///
/// NULL 排在所有键值之前，所以该键紧跟在父行本身和序号更小的兄弟分支之后，
/// 在任何真实子行之前。child_type 不是父行的直接子类型时返回 None。
pub(crate) fn null_child_hkey(parent: &HKey, child_type: &RowType) -> Option<HKey> {
    let label = child_type.hierarchy_label()?;
    if label.depth != parent.depth() {
        return None;
    }
    let nulls = vec![Value::Null; child_type.hkey_segment_width()];
    Some(parent.clone().child(label.ordinal, nulls))
}

impl FlattenedRow {
    pub fn new(
        row_type: Arc<RowType>,
        parent: Option<RowRef>,
        child: Option<RowRef>,
    ) -> RowResult<Self> {
        let (parent_type, child_type) = match row_type.kind() {
            RowTypeKind::Flattened { parent, child } => (Arc::clone(parent), Arc::clone(child)),
            _ => {
                return Err(RowError::WrongKind(format!(
                    "{} 不是扁平行类型",
                    row_type.name()
                )))
            }
        };
        let actual = parent_type.n_fields() + child_type.n_fields();
        if actual != row_type.n_fields() {
            return Err(RowError::FieldCountMismatch {
                row_type: row_type.name().to_string(),
                expected: row_type.n_fields(),
                actual,
            });
        }
        if parent.is_none() && child.is_none() {
            return Err(RowError::WrongKind(format!(
                "{} 的两侧输入都缺失",
                row_type.name()
            )));
        }
        if let Some(p) = &parent {
            if !p.row_type().is(&parent_type) {
                return Err(input_mismatch(&row_type, "parent", &parent_type, p));
            }
        }
        if let Some(c) = &child {
            if !c.row_type().is(&child_type) {
                return Err(input_mismatch(&row_type, "child", &child_type, c));
            }
        }
        if let (Some(p), Some(c)) = (&parent, &child) {
            if !p.ancestor_of(c) {
                return Err(RowError::HKeyMismatch {
                    row_type: row_type.name().to_string(),
                    left: p.hkey().map(|k| k.to_string()).unwrap_or_default(),
                    right: c.hkey().map(|k| k.to_string()).unwrap_or_default(),
                });
            }
        }

        let null_child_hkey = match (&parent, &child) {
            (Some(p), None) => p.hkey().and_then(|k| null_child_hkey(k, &child_type)),
            _ => None,
        };
        let row = Self {
            parent_fields: parent_type.n_fields(),
            row_type,
            parent,
            child,
            null_child_hkey,
        };
        check_present_values(&row.row_type, |i| row.side_value(i))?;
        Ok(row)
    }

    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    pub fn parent(&self) -> Option<&RowRef> {
        self.parent.as_ref()
    }

    pub fn child(&self) -> Option<&RowRef> {
        self.child.as_ref()
    }

    fn side_value(&self, index: usize) -> Option<RowResult<&Value>> {
        if index < self.parent_fields {
            self.parent.as_ref().map(|p| p.value(index))
        } else {
            self.child
                .as_ref()
                .map(|c| c.value(index - self.parent_fields))
        }
    }

    pub(super) fn value(&self, index: usize) -> RowResult<&Value> {
        self.side_value(index).unwrap_or(Ok(Row::null()))
    }

    /// 子行存在时取子行 HKey，否则取父行 HKey 加 NULL 子表段
    pub(super) fn hkey(&self) -> Option<&HKey> {
        self.child
            .as_ref()
            .and_then(|c| c.hkey())
            .or(self.null_child_hkey.as_ref())
            .or_else(|| self.parent.as_ref().and_then(|p| p.hkey()))
    }

    pub(super) fn contains_real_row_of(&self, table: TableId) -> bool {
        self.parent
            .as_ref()
            .map(|p| p.contains_real_row_of(table))
            .unwrap_or(false)
            || self
                .child
                .as_ref()
                .map(|c| c.contains_real_row_of(table))
                .unwrap_or(false)
    }
}

/// 校验存在一侧的运行时值类型
///
/// 缺失一侧不校验；输入本身是带缺失侧的扁平行时，NULL 也放行。
fn check_present_values<'a>(
    row_type: &RowType,
    value_at: impl Fn(usize) -> Option<RowResult<&'a Value>>,
) -> RowResult<()> {
    for (index, field_type) in row_type.fields().iter().enumerate() {
        if let Some(value) = value_at(index) {
            let value = value?;
            if !value.is_null() && !field_type.accepts(value) {
                return Err(RowError::FieldTypeMismatch {
                    row_type: row_type.name().to_string(),
                    index,
                    expected: field_type.to_string(),
                    actual: value.type_name().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// 乘积行：同一分支祖先下两个分支的行的组合
#[derive(Debug, Clone)]
pub struct ProductRow {
    row_type: Arc<RowType>,
    left: RowRef,
    right: RowRef,
    left_fields: usize,
    right_fields: Vec<usize>,
}

impl ProductRow {
    pub fn new(row_type: Arc<RowType>, left: RowRef, right: RowRef) -> RowResult<Self> {
        let (left_type, depth, right_type, right_fields) = match row_type.kind() {
            RowTypeKind::Product {
                left,
                branch_depth,
                right,
                right_fields,
                ..
            } => (
                Arc::clone(left),
                *branch_depth + 1,
                Arc::clone(right),
                right_fields.clone(),
            ),
            _ => {
                return Err(RowError::WrongKind(format!(
                    "{} 不是乘积行类型",
                    row_type.name()
                )))
            }
        };
        let actual = left_type.n_fields() + right_fields.len();
        if actual != row_type.n_fields() {
            return Err(RowError::FieldCountMismatch {
                row_type: row_type.name().to_string(),
                expected: row_type.n_fields(),
                actual,
            });
        }
        if !left.row_type().is(&left_type) {
            return Err(input_mismatch(&row_type, "left", &left_type, &left));
        }
        if !right.row_type().is(&right_type) {
            return Err(input_mismatch(&row_type, "right", &right_type, &right));
        }

        // 两侧必须挂在同一个分支祖先行下
        let shared = match (left.hkey(), right.hkey()) {
            (Some(l), Some(r)) => {
                l.depth() >= depth && r.depth() >= depth && l.prefix(depth) == r.prefix(depth)
            }
            _ => false,
        };
        if !shared {
            return Err(RowError::HKeyMismatch {
                row_type: row_type.name().to_string(),
                left: left.hkey().map(|k| k.to_string()).unwrap_or_default(),
                right: right.hkey().map(|k| k.to_string()).unwrap_or_default(),
            });
        }

        let row = Self {
            left_fields: left_type.n_fields(),
            row_type,
            left,
            right,
            right_fields,
        };
        check_present_values(&row.row_type, |i| Some(row.value(i)))?;
        Ok(row)
    }

    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    pub fn left(&self) -> &RowRef {
        &self.left
    }

    pub fn right(&self) -> &RowRef {
        &self.right
    }

    pub(super) fn value(&self, index: usize) -> RowResult<&Value> {
        if index < self.left_fields {
            self.left.value(index)
        } else {
            self.right.value(self.right_fields[index - self.left_fields])
        }
    }

    pub(super) fn hkey(&self) -> Option<&HKey> {
        self.left.hkey()
    }

    pub(super) fn contains_real_row_of(&self, table: TableId) -> bool {
        self.left.contains_real_row_of(table) || self.right.contains_real_row_of(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::row::TableRow;
    use crate::core::schema::{FieldDef, Schema, SchemaBuilder};
    use crate::core::value::{DataType, FieldType};

    struct Fixture {
        schema: Schema,
        customer: TableId,
        order: TableId,
        address: TableId,
    }

    fn fixture() -> Fixture {
        let int = |n: &str| FieldDef::new(n, FieldType::not_null(DataType::Int32));
        let mut b = SchemaBuilder::new(1);
        let customer = b
            .root_table(
                "customer",
                vec![int("cid"), FieldDef::new("name", FieldType::nullable(DataType::String))],
                vec![0],
            )
            .unwrap();
        let order = b
            .child_table(
                "order",
                customer,
                vec![int("oid"), int("cid"), FieldDef::new("date", FieldType::nullable(DataType::Date))],
                vec![0],
                vec![1],
            )
            .unwrap();
        let address = b
            .child_table(
                "address",
                customer,
                vec![int("aid"), int("cid"), FieldDef::new("street", FieldType::nullable(DataType::String))],
                vec![0],
                vec![1],
            )
            .unwrap();
        Fixture {
            schema: b.build().unwrap(),
            customer,
            order,
            address,
        }
    }

    fn row(schema: &Schema, table: TableId, parent: Option<&HKey>, values: Vec<Value>) -> RowRef {
        let hkey = schema.row_hkey(table, parent, &values).unwrap();
        Arc::new(Row::Table(
            TableRow::new(schema.table_type(table).unwrap(), hkey, values).unwrap(),
        ))
    }

    #[test]
    fn test_flattened_field_layout() {
        let f = fixture();
        let c = row(&f.schema, f.customer, None, vec![Value::Int32(1), Value::from("ann")]);
        let o = row(
            &f.schema,
            f.order,
            c.hkey(),
            vec![Value::Int32(10), Value::Int32(1), Value::date(2024, 3, 1)],
        );
        let ft = f
            .schema
            .new_flatten_type(c.row_type(), o.row_type())
            .unwrap();
        let flat = Row::from(FlattenedRow::new(ft, Some(c.clone()), Some(o.clone())).unwrap());
        assert_eq!(flat.n_fields(), 5);
        assert_eq!(flat.value(0).unwrap(), &Value::Int32(1));
        assert_eq!(flat.value(4).unwrap(), &Value::date(2024, 3, 1));
        assert_eq!(flat.hkey(), o.hkey());
        assert!(flat.contains_real_row_of(f.customer));
        assert!(flat.contains_real_row_of(f.order));
        assert!(!flat.contains_real_row_of(f.address));
    }

    #[test]
    fn test_orphan_child_reads_parent_as_null() {
        let f = fixture();
        let c_key = HKey::root(0, vec![Value::Int32(9)]);
        let o = row(
            &f.schema,
            f.order,
            Some(&c_key),
            vec![Value::Int32(90), Value::Int32(9), Value::Null],
        );
        let ct = f.schema.table_type(f.customer).unwrap();
        let ft = f.schema.new_flatten_type(&ct, o.row_type()).unwrap();
        let flat = Row::from(FlattenedRow::new(ft, None, Some(o)).unwrap());
        assert_eq!(flat.value(0).unwrap(), &Value::Null);
        assert_eq!(flat.value(2).unwrap(), &Value::Int32(90));
        assert!(!flat.contains_real_row_of(f.customer));
    }

    #[test]
    fn test_missing_child_gets_null_segment() {
        let f = fixture();
        let c = row(&f.schema, f.customer, None, vec![Value::Int32(2), Value::Null]);
        let ot = f.schema.table_type(f.order).unwrap();
        let ft = f.schema.new_flatten_type(c.row_type(), &ot).unwrap();
        let flat = Row::from(FlattenedRow::new(ft, Some(c.clone()), None).unwrap());
        let key = flat.hkey().unwrap();
        assert_eq!(key.to_string(), "{0:(2),1:(NULL)}");

        // 父行之后、真实子行与后面的兄弟分支之前
        let o = row(
            &f.schema,
            f.order,
            c.hkey(),
            vec![Value::Int32(-5), Value::Int32(2), Value::Null],
        );
        let a = row(
            &f.schema,
            f.address,
            c.hkey(),
            vec![Value::Int32(1), Value::Int32(2), Value::Null],
        );
        assert!(c.hkey().unwrap() < key);
        assert!(key < o.hkey().unwrap());
        assert!(key < a.hkey().unwrap());
    }

    #[test]
    fn test_flattened_rejects_wrong_input_type() {
        let f = fixture();
        let c = row(&f.schema, f.customer, None, vec![Value::Int32(1), Value::Null]);
        let a = row(
            &f.schema,
            f.address,
            c.hkey(),
            vec![Value::Int32(5), Value::Int32(1), Value::Null],
        );
        let ot = f.schema.table_type(f.order).unwrap();
        let ft = f.schema.new_flatten_type(c.row_type(), &ot).unwrap();
        let err = FlattenedRow::new(ft, Some(c), Some(a)).unwrap_err();
        assert!(matches!(err, RowError::InputTypeMismatch { side: "child", .. }));
    }

    #[test]
    fn test_flattened_rejects_unrelated_keys() {
        let f = fixture();
        let c1 = row(&f.schema, f.customer, None, vec![Value::Int32(1), Value::Null]);
        let c2 = row(&f.schema, f.customer, None, vec![Value::Int32(2), Value::Null]);
        let o2 = row(
            &f.schema,
            f.order,
            c2.hkey(),
            vec![Value::Int32(20), Value::Int32(2), Value::Null],
        );
        let ft = f.schema.new_flatten_type(c1.row_type(), o2.row_type()).unwrap();
        assert!(matches!(
            FlattenedRow::new(ft, Some(c1), Some(o2)),
            Err(RowError::HKeyMismatch { .. })
        ));
    }

    #[test]
    fn test_product_row_dedups_customer_id() {
        let f = fixture();
        let c = row(&f.schema, f.customer, None, vec![Value::Int32(1), Value::from("ann")]);
        let o = row(
            &f.schema,
            f.order,
            c.hkey(),
            vec![Value::Int32(10), Value::Int32(1), Value::Null],
        );
        let a = row(
            &f.schema,
            f.address,
            c.hkey(),
            vec![Value::Int32(5), Value::Int32(1), Value::from("main st")],
        );
        let ft = f.schema.new_flatten_type(c.row_type(), o.row_type()).unwrap();
        let co: RowRef = Arc::new(FlattenedRow::new(ft, Some(c), Some(o.clone())).unwrap().into());
        let pt = f
            .schema
            .new_product_type(co.row_type(), f.customer, a.row_type())
            .unwrap();
        let p = Row::from(ProductRow::new(pt, co, a).unwrap());
        assert_eq!(p.n_fields(), 7);
        assert_eq!(p.value(5).unwrap(), &Value::Int32(5));
        assert_eq!(p.value(6).unwrap(), &Value::from("main st"));
        assert_eq!(p.hkey(), o.hkey());
        assert!(p.contains_real_row_of(f.address));
    }

    #[test]
    fn test_product_rejects_different_branch_rows() {
        let f = fixture();
        let c1 = row(&f.schema, f.customer, None, vec![Value::Int32(1), Value::Null]);
        let c2 = row(&f.schema, f.customer, None, vec![Value::Int32(2), Value::Null]);
        let o = row(
            &f.schema,
            f.order,
            c1.hkey(),
            vec![Value::Int32(10), Value::Int32(1), Value::Null],
        );
        let a = row(
            &f.schema,
            f.address,
            c2.hkey(),
            vec![Value::Int32(5), Value::Int32(2), Value::Null],
        );
        let pt = f
            .schema
            .new_product_type(o.row_type(), f.customer, a.row_type())
            .unwrap();
        assert!(matches!(
            ProductRow::new(pt, o, a),
            Err(RowError::HKeyMismatch { .. })
        ));
    }
}
