//! 模式快照
//!
//! 一个 [`Schema`] 对应一个模式版本：组、表、表行类型在构建后不可变；
//! 合成行类型（扁平、乘积）由模式自身拥有的并发 arena 记忆化，
//! 同一版本内对同一组输入的重复请求返回同一个 `Arc<RowType>`。
//! 模式变更时整个快照连同其 arena 一起丢弃。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

pub mod builder;
pub mod hkey;
pub mod row_type;
pub mod table;

pub use builder::SchemaBuilder;
pub use hkey::{HKey, HKeySegment};
pub use row_type::{RowType, RowTypeId, RowTypeKind};
pub use table::{FieldDef, GroupDef, GroupId, HierarchyLabel, TableDef, TableId};

use crate::core::error::{RowError, RowResult};
use crate::core::value::{FieldType, Value};

/// 合成行类型的记忆化键：(种类, 输入类型身份)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SyntheticKey {
    Flatten(RowTypeId, RowTypeId),
    Product(RowTypeId, TableId, RowTypeId),
}

/// 模式快照
#[derive(Debug)]
pub struct Schema {
    version: u64,
    groups: Vec<GroupDef>,
    tables: Vec<TableDef>,
    table_types: Vec<Arc<RowType>>,
    by_name: HashMap<String, TableId>,
    synthetic: DashMap<SyntheticKey, Arc<RowType>>,
    next_type_id: AtomicU32,
}

impl Schema {
    pub(crate) fn from_parts(
        version: u64,
        groups: Vec<GroupDef>,
        tables: Vec<TableDef>,
        table_types: Vec<Arc<RowType>>,
        by_name: HashMap<String, TableId>,
    ) -> Self {
        let next = table_types.len() as u32;
        Self {
            version,
            groups,
            tables,
            table_types,
            by_name,
            synthetic: DashMap::new(),
            next_type_id: AtomicU32::new(next),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn groups(&self) -> &[GroupDef] {
        &self.groups
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> RowResult<&TableDef> {
        self.tables
            .get(id.0 as usize)
            .ok_or_else(|| RowError::UnknownTable(id.to_string()))
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableDef> {
        self.by_name.get(name).map(|id| &self.tables[id.0 as usize])
    }

    /// 表行类型
    pub fn table_type(&self, id: TableId) -> RowResult<Arc<RowType>> {
        self.table_types
            .get(id.0 as usize)
            .cloned()
            .ok_or_else(|| RowError::UnknownTable(id.to_string()))
    }

    /// 已创建的合成行类型数量
    pub fn synthetic_type_count(&self) -> usize {
        self.synthetic.len()
    }

    /// 计算表行的 HKey：父行 HKey 追加本表主键段
    pub fn row_hkey(&self, table: TableId, parent: Option<&HKey>, values: &[Value]) -> RowResult<HKey> {
        let def = self.table(table)?;
        let pk: Vec<Value> = def
            .pk_fields
            .iter()
            .map(|&i| {
                values
                    .get(i)
                    .cloned()
                    .ok_or_else(|| RowError::FieldIndexOutOfRange {
                        row_type: def.name.clone(),
                        index: i,
                        n_fields: values.len(),
                    })
            })
            .collect::<RowResult<_>>()?;
        match (parent, def.parent) {
            (None, None) => Ok(HKey::root(def.label.ordinal, pk)),
            (Some(parent_key), Some(_)) if parent_key.depth() == def.label.depth => {
                Ok(parent_key.clone().child(def.label.ordinal, pk))
            }
            _ => Err(RowError::InvalidSchema(format!(
                "表 {} 的父 HKey 与层次深度 {} 不符",
                def.name, def.label.depth
            ))),
        }
    }

    fn allocate_id(&self) -> RowTypeId {
        RowTypeId(self.next_type_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check_version(&self, row_type: &RowType) -> RowResult<()> {
        if row_type.schema_version() != self.version {
            return Err(RowError::InvalidSyntheticType(format!(
                "{} 属于模式版本 {}, 当前版本 {}",
                row_type.name(),
                row_type.schema_version(),
                self.version
            )));
        }
        Ok(())
    }

    /// 扁平行类型：parent 必须是 child 的祖先类型
    pub fn new_flatten_type(
        &self,
        parent: &Arc<RowType>,
        child: &Arc<RowType>,
    ) -> RowResult<Arc<RowType>> {
        self.check_version(parent)?;
        self.check_version(child)?;
        if !parent.ancestor_of(child) {
            return Err(RowError::InvalidSyntheticType(format!(
                "flatten({}, {}): {} 不是 {} 的祖先",
                parent.name(),
                child.name(),
                parent.name(),
                child.name()
            )));
        }
        let key = SyntheticKey::Flatten(parent.id(), child.id());
        let entry = self.synthetic.entry(key).or_insert_with(|| {
            let mut fields = parent.fields().to_vec();
            fields.extend_from_slice(child.fields());
            let name = format!("flatten({}, {})", parent.name(), child.name());
            debug!("创建扁平行类型 {}", name);
            Arc::new(RowType::new(
                self.allocate_id(),
                self.version,
                name,
                RowTypeKind::Flattened {
                    parent: Arc::clone(parent),
                    child: Arc::clone(child),
                },
                fields,
            ))
        });
        Ok(Arc::clone(entry.value()))
    }

    /// 乘积行类型：left 与 right 都位于 branch 之下
    ///
    /// 两侧都在字段中嵌入了 branch 的键时，右侧的这些字段只保留一份（取左侧）。
    pub fn new_product_type(
        &self,
        left: &Arc<RowType>,
        branch: TableId,
        right: &Arc<RowType>,
    ) -> RowResult<Arc<RowType>> {
        self.check_version(left)?;
        self.check_version(right)?;
        let branch_label = self.table(branch)?.label;
        let under_branch = |t: &RowType| {
            t.hierarchy_label()
                .map(|l| l == branch_label || branch_label.ancestor_of(&l))
                .unwrap_or(false)
        };
        if !under_branch(left) || !under_branch(right) {
            return Err(RowError::InvalidSyntheticType(format!(
                "product({}, {}, {}): 两侧必须都位于分支表之下",
                left.name(),
                branch,
                right.name()
            )));
        }
        if right.tables().iter().any(|t| left.has_table(*t)) {
            return Err(RowError::InvalidSyntheticType(format!(
                "product({}, {}, {}): 两侧包含相同的表",
                left.name(),
                branch,
                right.name()
            )));
        }

        let key = SyntheticKey::Product(left.id(), branch, right.id());
        let entry = self.synthetic.entry(key).or_insert_with(|| {
            let skipped = if left.embeds(branch) && right.embeds(branch) {
                right.ancestor_key_fields(branch).unwrap_or_default()
            } else {
                Vec::new()
            };
            let right_fields: Vec<usize> = (0..right.n_fields())
                .filter(|i| !skipped.contains(i))
                .collect();
            let mut fields = left.fields().to_vec();
            fields.extend(right_fields.iter().map(|&i| right.fields()[i]));
            let branch_name = self
                .tables
                .get(branch.0 as usize)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| branch.to_string());
            let name = format!("product({}, {}, {})", left.name(), branch_name, right.name());
            debug!("创建乘积行类型 {} ({} 个字段)", name, fields.len());
            Arc::new(RowType::new(
                self.allocate_id(),
                self.version,
                name,
                RowTypeKind::Product {
                    left: Arc::clone(left),
                    branch,
                    branch_depth: branch_label.depth,
                    right: Arc::clone(right),
                    right_fields,
                },
                fields,
            ))
        });
        Ok(Arc::clone(entry.value()))
    }

    /// VALUES 行类型，每次调用都是新的类型
    pub fn new_values_type(&self, fields: Vec<FieldType>) -> Arc<RowType> {
        let id = self.allocate_id();
        Arc::new(RowType::new(
            id,
            self.version,
            format!("values#{}", id.0),
            RowTypeKind::Values,
            fields,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::DataType;

    struct Fixture {
        schema: Schema,
        customer: TableId,
        order: TableId,
        item: TableId,
        address: TableId,
    }

    fn fixture(address_embeds_customer: bool) -> Fixture {
        let mut b = SchemaBuilder::new(7);
        let int = |n: &str| FieldDef::new(n, FieldType::not_null(DataType::Int32));
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
                vec![
                    int("oid"),
                    int("cid"),
                    FieldDef::new("date", FieldType::nullable(DataType::Date)),
                ],
                vec![0],
                vec![1],
            )
            .unwrap();
        let item = b
            .child_table("item", order, vec![int("iid"), int("oid")], vec![0], vec![1])
            .unwrap();
        let join = if address_embeds_customer { vec![1] } else { vec![] };
        let address = b
            .child_table(
                "address",
                customer,
                vec![
                    int("aid"),
                    int("cid"),
                    FieldDef::new("street", FieldType::nullable(DataType::String)),
                ],
                vec![0],
                join,
            )
            .unwrap();
        Fixture {
            schema: b.build().unwrap(),
            customer,
            order,
            item,
            address,
        }
    }

    #[test]
    fn test_flatten_type_is_memoized() {
        let f = fixture(true);
        let c = f.schema.table_type(f.customer).unwrap();
        let o = f.schema.table_type(f.order).unwrap();
        let a = f.schema.new_flatten_type(&c, &o).unwrap();
        let b = f.schema.new_flatten_type(&c, &o).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.n_fields(), 5);
        assert_eq!(f.schema.synthetic_type_count(), 1);
        assert_eq!(a.type_at(4).unwrap().data_type, DataType::Date);
    }

    #[test]
    fn test_flatten_requires_ancestor() {
        let f = fixture(true);
        let o = f.schema.table_type(f.order).unwrap();
        let a = f.schema.table_type(f.address).unwrap();
        assert!(matches!(
            f.schema.new_flatten_type(&o, &a),
            Err(RowError::InvalidSyntheticType(_))
        ));
    }

    #[test]
    fn test_product_dedups_embedded_ancestor_key() {
        let f = fixture(true);
        let c = f.schema.table_type(f.customer).unwrap();
        let o = f.schema.table_type(f.order).unwrap();
        let a = f.schema.table_type(f.address).unwrap();
        let co = f.schema.new_flatten_type(&c, &o).unwrap();
        let p = f.schema.new_product_type(&co, f.customer, &a).unwrap();
        assert_eq!(p.n_fields(), 7);
        assert!(p.has_table(f.address));
        assert!(p.has_table(f.customer));
        assert!(!p.has_table(f.item));

        let again = f.schema.new_product_type(&co, f.customer, &a).unwrap();
        assert!(Arc::ptr_eq(&p, &again));
    }

    #[test]
    fn test_product_keeps_all_fields_without_embedded_key() {
        let f = fixture(false);
        let c = f.schema.table_type(f.customer).unwrap();
        let o = f.schema.table_type(f.order).unwrap();
        let a = f.schema.table_type(f.address).unwrap();
        let co = f.schema.new_flatten_type(&c, &o).unwrap();
        let p = f.schema.new_product_type(&co, f.customer, &a).unwrap();
        assert_eq!(p.n_fields(), 8);
    }

    #[test]
    fn test_ancestry_of_synthetic_types() {
        let f = fixture(true);
        let c = f.schema.table_type(f.customer).unwrap();
        let o = f.schema.table_type(f.order).unwrap();
        let i = f.schema.table_type(f.item).unwrap();
        let co = f.schema.new_flatten_type(&c, &o).unwrap();
        assert!(c.ancestor_of(&i));
        assert!(co.ancestor_of(&i));
        assert!(co.parent_of(&i));
        assert!(!i.ancestor_of(&c));
        assert!(!c.ancestor_of(&c));
    }

    #[test]
    fn test_structural_vs_nullability_equality() {
        let f = fixture(true);
        let v1 = f
            .schema
            .new_values_type(vec![FieldType::not_null(DataType::Int32)]);
        let v2 = f
            .schema
            .new_values_type(vec![FieldType::nullable(DataType::Int32)]);
        assert!(!Arc::ptr_eq(&v1, &v2));
        assert!(v1.structurally_equal(&v2));
        assert!(!v1.equals_with_nullability(&v2));
    }

    #[test]
    fn test_row_hkey() {
        let f = fixture(true);
        let c_key = f
            .schema
            .row_hkey(f.customer, None, &[Value::Int32(1), Value::from("a")])
            .unwrap();
        let o_key = f
            .schema
            .row_hkey(
                f.order,
                Some(&c_key),
                &[Value::Int32(10), Value::Int32(1), Value::Null],
            )
            .unwrap();
        assert_eq!(o_key.to_string(), "{0:(1),1:(10)}");
        assert!(f
            .schema
            .row_hkey(f.order, None, &[Value::Int32(10), Value::Int32(1), Value::Null])
            .is_err());
    }

    #[test]
    fn test_field_index_through_product() {
        let f = fixture(true);
        let c = f.schema.table_type(f.customer).unwrap();
        let o = f.schema.table_type(f.order).unwrap();
        let a = f.schema.table_type(f.address).unwrap();
        let co = f.schema.new_flatten_type(&c, &o).unwrap();
        let p = f.schema.new_product_type(&co, f.customer, &a).unwrap();
        let street = crate::core::expression::ColumnRef::new(f.address, 2);
        let dropped = crate::core::expression::ColumnRef::new(f.address, 1);
        assert_eq!(p.field_index(&street), Some(6));
        // 被去重的右侧祖先键列映射到左侧保留的那一列
        assert_eq!(p.field_index(&dropped), Some(0));
        assert_eq!(p.ancestor_key_fields(f.customer), Some(vec![0]));
    }
}
