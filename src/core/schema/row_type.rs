//! 行类型
//!
//! 每张存储表对应一个表行类型；扁平、乘积、VALUES 三种合成行类型按需由
//! [`Schema`](super::Schema) 创建，创建后不可变。合成类型的字段是输入类型字段的拼接
//! （乘积类型会去掉右侧重复的祖先键字段）。
//!
//! 两种相等契约：
//! - `structurally_equal`：只比较字段数据类型，供优化器代价比较使用
//! - `equals_with_nullability`：同时比较可空性，供执行期行身份检查使用
//!
//! 行类型身份（`id`）在同一模式版本内稳定，可作为快速相等判断。

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::table::{HierarchyLabel, TableId};
use crate::core::error::{RowError, RowResult};
use crate::core::expression::ColumnRef;
use crate::core::value::FieldType;

/// 行类型标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowTypeId(pub u32);

/// 行类型种类
#[derive(Debug, Clone)]
pub enum RowTypeKind {
    /// 存储表
    Table {
        table: TableId,
        parent: Option<TableId>,
        pk_fields: Vec<usize>,
        parent_join_fields: Vec<usize>,
        label: HierarchyLabel,
    },
    /// 祖先行 + 后代行
    Flattened {
        parent: Arc<RowType>,
        child: Arc<RowType>,
    },
    /// 同一祖先下两个分支的交叉组合
    Product {
        left: Arc<RowType>,
        branch: TableId,
        /// 分支表在组内的深度
        branch_depth: usize,
        right: Arc<RowType>,
        /// 右侧保留的字段位置
        right_fields: Vec<usize>,
    },
    /// 常量行
    Values,
}

/// 行类型
#[derive(Debug)]
pub struct RowType {
    id: RowTypeId,
    schema_version: u64,
    name: String,
    kind: RowTypeKind,
    fields: Vec<FieldType>,
    tables: Vec<TableId>,
}

impl RowType {
    pub(crate) fn new(
        id: RowTypeId,
        schema_version: u64,
        name: String,
        kind: RowTypeKind,
        fields: Vec<FieldType>,
    ) -> Self {
        let tables = match &kind {
            RowTypeKind::Table { table, .. } => vec![*table],
            RowTypeKind::Flattened { parent, child } => {
                let mut tables = parent.tables.clone();
                tables.extend(child.tables.iter().copied());
                tables
            }
            RowTypeKind::Product { left, right, .. } => {
                let mut tables = left.tables.clone();
                tables.extend(right.tables.iter().copied());
                tables
            }
            RowTypeKind::Values => Vec::new(),
        };
        Self {
            id,
            schema_version,
            name,
            kind,
            fields,
            tables,
        }
    }

    pub fn id(&self) -> RowTypeId {
        self.id
    }

    pub fn schema_version(&self) -> u64 {
        self.schema_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &RowTypeKind {
        &self.kind
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    pub fn type_at(&self, index: usize) -> RowResult<FieldType> {
        self.fields
            .get(index)
            .copied()
            .ok_or_else(|| RowError::FieldIndexOutOfRange {
                row_type: self.name.clone(),
                index,
                n_fields: self.fields.len(),
            })
    }

    /// 同一行类型（身份相等）
    pub fn is(&self, other: &RowType) -> bool {
        self.id == other.id && self.schema_version == other.schema_version
    }

    /// 结构相等：字段数与各字段数据类型相同
    pub fn structurally_equal(&self, other: &RowType) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.same_shape(b))
    }

    /// 包含可空性的相等
    pub fn equals_with_nullability(&self, other: &RowType) -> bool {
        self.fields == other.fields
    }

    /// 表行类型对应的表
    pub fn table(&self) -> Option<TableId> {
        match &self.kind {
            RowTypeKind::Table { table, .. } => Some(*table),
            _ => None,
        }
    }

    pub fn is_table_type(&self) -> bool {
        matches!(self.kind, RowTypeKind::Table { .. })
    }

    /// 行类型是否包含某张表的真实行
    pub fn has_table(&self, table: TableId) -> bool {
        self.tables.contains(&table)
    }

    /// 包含真实行的表
    pub fn tables(&self) -> &[TableId] {
        &self.tables
    }

    /// 层次标号：扁平类型取子侧，乘积类型取左侧（与各自行的 HKey 来源一致）
    pub fn hierarchy_label(&self) -> Option<HierarchyLabel> {
        match &self.kind {
            RowTypeKind::Table { label, .. } => Some(*label),
            RowTypeKind::Flattened { child, .. } => child.hierarchy_label(),
            RowTypeKind::Product { left, .. } => left.hierarchy_label(),
            RowTypeKind::Values => None,
        }
    }

    /// 本层 HKey 段的键值个数：表行类型为主键列数，合成类型取提供 HKey 的一侧
    pub fn hkey_segment_width(&self) -> usize {
        match &self.kind {
            RowTypeKind::Table { pk_fields, .. } => pk_fields.len(),
            RowTypeKind::Flattened { child, .. } => child.hkey_segment_width(),
            RowTypeKind::Product { left, .. } => left.hkey_segment_width(),
            RowTypeKind::Values => 0,
        }
    }

    /// self 是否为 other 的真祖先类型，O(1)
    pub fn ancestor_of(&self, other: &RowType) -> bool {
        match (self.hierarchy_label(), other.hierarchy_label()) {
            (Some(a), Some(b)) => a.ancestor_of(&b),
            _ => false,
        }
    }

    /// self 是否为 other 的直接父类型
    pub fn parent_of(&self, other: &RowType) -> bool {
        match (self.hierarchy_label(), other.hierarchy_label()) {
            (Some(a), Some(b)) => a.parent_of(&b),
            _ => false,
        }
    }

    /// 保存祖先表 `table` 键值的字段位置
    ///
    /// 表本身返回主键列；直接子表返回引用父键的列（HKey-only 子表返回空列表）；
    /// 不携带该祖先键时返回 None。
    pub fn ancestor_key_fields(&self, table: TableId) -> Option<Vec<usize>> {
        match &self.kind {
            RowTypeKind::Table {
                table: own,
                parent,
                pk_fields,
                parent_join_fields,
                ..
            } => {
                if *own == table {
                    Some(pk_fields.clone())
                } else if *parent == Some(table) {
                    Some(parent_join_fields.clone())
                } else {
                    None
                }
            }
            RowTypeKind::Flattened { parent, child } => {
                parent.ancestor_key_fields(table).or_else(|| {
                    let offset = parent.n_fields();
                    child
                        .ancestor_key_fields(table)
                        .map(|fields| fields.into_iter().map(|f| f + offset).collect())
                })
            }
            RowTypeKind::Product {
                left,
                right,
                right_fields,
                ..
            } => left.ancestor_key_fields(table).or_else(|| {
                let offset = left.n_fields();
                right.ancestor_key_fields(table).map(|fields| {
                    fields
                        .into_iter()
                        .filter_map(|f| right_fields.iter().position(|&kept| kept == f))
                        .map(|p| p + offset)
                        .collect()
                })
            }),
            RowTypeKind::Values => None,
        }
    }

    /// 是否在字段中嵌入了祖先表的键
    pub fn embeds(&self, table: TableId) -> bool {
        self.ancestor_key_fields(table)
            .map(|fields| !fields.is_empty())
            .unwrap_or(false)
    }

    /// 列引用在本行类型中的字段下标
    pub fn field_index(&self, column: &ColumnRef) -> Option<usize> {
        match &self.kind {
            RowTypeKind::Table { table, .. } => {
                (*table == column.table && column.position < self.fields.len())
                    .then_some(column.position)
            }
            RowTypeKind::Flattened { parent, child } => parent
                .field_index(column)
                .or_else(|| child.field_index(column).map(|i| i + parent.n_fields())),
            RowTypeKind::Product {
                left,
                branch,
                right,
                right_fields,
                ..
            } => left.field_index(column).or_else(|| {
                let ri = right.field_index(column)?;
                match right_fields.iter().position(|&kept| kept == ri) {
                    Some(p) => Some(p + left.n_fields()),
                    None => {
                        let k = right
                            .ancestor_key_fields(*branch)?
                            .iter()
                            .position(|&f| f == ri)?;
                        left.ancestor_key_fields(*branch)?.get(k).copied()
                    }
                }
            }),
            RowTypeKind::Values => None,
        }
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
