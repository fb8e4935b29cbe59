//! 模式构建器
//!
//! 先声明根表和子表，`build()` 时统一分配组内先序/后序序号并校验主键、父连接列。
//! 构建完成后的 [`Schema`] 不可变。

use std::collections::HashMap;

use log::debug;

use super::row_type::{RowType, RowTypeId, RowTypeKind};
use super::table::{FieldDef, GroupDef, GroupId, HierarchyLabel, TableDef, TableId};
use super::Schema;
use crate::core::error::{RowError, RowResult};

struct PendingTable {
    name: String,
    parent: Option<TableId>,
    fields: Vec<FieldDef>,
    pk_fields: Vec<usize>,
    parent_join_fields: Vec<usize>,
}

/// 模式构建器
pub struct SchemaBuilder {
    version: u64,
    tables: Vec<PendingTable>,
    by_name: HashMap<String, TableId>,
}

impl SchemaBuilder {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            tables: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// 声明组根表，每个根表开启一个新组
    pub fn root_table(
        &mut self,
        name: &str,
        fields: Vec<FieldDef>,
        pk_fields: Vec<usize>,
    ) -> RowResult<TableId> {
        self.add(name, None, fields, pk_fields, Vec::new())
    }

    /// 声明子表
    ///
    /// `parent_join_fields` 为引用父表主键的列；传空表示父子关系只体现在 HKey 中。
    pub fn child_table(
        &mut self,
        name: &str,
        parent: TableId,
        fields: Vec<FieldDef>,
        pk_fields: Vec<usize>,
        parent_join_fields: Vec<usize>,
    ) -> RowResult<TableId> {
        if parent.0 as usize >= self.tables.len() {
            return Err(RowError::UnknownTable(parent.to_string()));
        }
        self.add(name, Some(parent), fields, pk_fields, parent_join_fields)
    }

    fn add(
        &mut self,
        name: &str,
        parent: Option<TableId>,
        fields: Vec<FieldDef>,
        pk_fields: Vec<usize>,
        parent_join_fields: Vec<usize>,
    ) -> RowResult<TableId> {
        if self.by_name.contains_key(name) {
            return Err(RowError::InvalidSchema(format!("表 {} 重复定义", name)));
        }
        if pk_fields.is_empty() {
            return Err(RowError::InvalidSchema(format!("表 {} 没有主键", name)));
        }
        for &pos in pk_fields.iter().chain(parent_join_fields.iter()) {
            if pos >= fields.len() {
                return Err(RowError::FieldIndexOutOfRange {
                    row_type: name.to_string(),
                    index: pos,
                    n_fields: fields.len(),
                });
            }
        }
        if let Some(parent) = parent {
            let parent_def = &self.tables[parent.0 as usize];
            if !parent_join_fields.is_empty() {
                if parent_join_fields.len() != parent_def.pk_fields.len() {
                    return Err(RowError::InvalidSchema(format!(
                        "表 {} 的父连接列数 {} 与父表 {} 的主键列数 {} 不一致",
                        name,
                        parent_join_fields.len(),
                        parent_def.name,
                        parent_def.pk_fields.len()
                    )));
                }
                for (&own, &theirs) in parent_join_fields.iter().zip(parent_def.pk_fields.iter()) {
                    let own_type = fields[own].field_type;
                    let parent_type = parent_def.fields[theirs].field_type;
                    if !own_type.same_shape(&parent_type) {
                        return Err(RowError::FieldTypeMismatch {
                            row_type: name.to_string(),
                            index: own,
                            expected: parent_type.data_type.to_string(),
                            actual: own_type.data_type.to_string(),
                        });
                    }
                }
            }
        }

        let id = TableId(self.tables.len() as u32);
        self.by_name.insert(name.to_string(), id);
        self.tables.push(PendingTable {
            name: name.to_string(),
            parent,
            fields,
            pk_fields,
            parent_join_fields,
        });
        Ok(id)
    }

    /// 分配层次标号并生成不可变模式
    pub fn build(self) -> RowResult<Schema> {
        let n = self.tables.len();
        let mut children: Vec<Vec<TableId>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (i, table) in self.tables.iter().enumerate() {
            match table.parent {
                Some(parent) => children[parent.0 as usize].push(TableId(i as u32)),
                None => roots.push(TableId(i as u32)),
            }
        }

        let mut labels: Vec<Option<HierarchyLabel>> = vec![None; n];
        let mut groups = Vec::with_capacity(roots.len());
        for (g, &root) in roots.iter().enumerate() {
            let group = GroupId(g as u32);
            let mut pre = 0u32;
            let mut post = 0u32;
            let mut order = Vec::new();
            // 显式栈的先序/后序遍历：(表, 子表是否已展开)
            let mut stack = vec![(root, None::<u32>, 0usize, false)];
            while let Some((table, parent_ordinal, depth, expanded)) = stack.pop() {
                let idx = table.0 as usize;
                if expanded {
                    if let Some(label) = labels[idx].as_mut() {
                        label.post_ordinal = post;
                    }
                    post += 1;
                    continue;
                }
                labels[idx] = Some(HierarchyLabel {
                    group,
                    ordinal: pre,
                    post_ordinal: 0,
                    parent_ordinal,
                    depth,
                });
                let ordinal = pre;
                pre += 1;
                order.push(table);
                stack.push((table, parent_ordinal, depth, true));
                for &child in children[idx].iter().rev() {
                    stack.push((child, Some(ordinal), depth + 1, false));
                }
            }
            groups.push(GroupDef {
                id: group,
                name: self.tables[root.0 as usize].name.clone(),
                root,
                tables: order,
            });
        }

        let mut tables = Vec::with_capacity(n);
        let mut table_types = Vec::with_capacity(n);
        for (i, pending) in self.tables.into_iter().enumerate() {
            let label = labels[i].ok_or_else(|| {
                RowError::InvalidSchema(format!("表 {} 不属于任何组", pending.name))
            })?;
            let def = TableDef {
                id: TableId(i as u32),
                name: pending.name,
                parent: pending.parent,
                fields: pending.fields,
                pk_fields: pending.pk_fields,
                parent_join_fields: pending.parent_join_fields,
                label,
            };
            table_types.push(std::sync::Arc::new(RowType::new(
                RowTypeId(i as u32),
                self.version,
                def.name.clone(),
                RowTypeKind::Table {
                    table: def.id,
                    parent: def.parent,
                    pk_fields: def.pk_fields.clone(),
                    parent_join_fields: def.parent_join_fields.clone(),
                    label,
                },
                def.fields.iter().map(|f| f.field_type).collect(),
            )));
            tables.push(def);
        }

        debug!(
            "模式版本 {} 构建完成: {} 个组, {} 张表",
            self.version,
            groups.len(),
            tables.len()
        );
        Ok(Schema::from_parts(
            self.version,
            groups,
            tables,
            table_types,
            self.by_name,
        ))
    }
}
