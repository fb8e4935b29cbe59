//! 表与组定义
//!
//! 组（group）是以根表键空间物理聚簇在一起的一组表。每张表在组内获得
//! 先序序号（ordinal，同时作为 HKey 段的表标识）和后序序号，
//! 祖先判断因此是 O(1) 的区间检查，而不必沿父链逐层向上走。

use serde::Serialize;
use std::fmt;

use crate::core::value::FieldType;

/// 表标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// 组标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(pub u32);

/// 字段定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// 表在组层次中的位置标号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HierarchyLabel {
    pub group: GroupId,
    /// 先序序号
    pub ordinal: u32,
    /// 后序序号
    pub post_ordinal: u32,
    /// 父表的先序序号
    pub parent_ordinal: Option<u32>,
    /// 深度，根表为 0
    pub depth: usize,
}

impl HierarchyLabel {
    /// self 是否为 other 的真祖先
    pub fn ancestor_of(&self, other: &HierarchyLabel) -> bool {
        self.group == other.group
            && self.ordinal < other.ordinal
            && other.post_ordinal < self.post_ordinal
    }

    /// self 是否为 other 的直接父表
    pub fn parent_of(&self, other: &HierarchyLabel) -> bool {
        self.group == other.group && other.parent_ordinal == Some(self.ordinal)
    }
}

/// 表定义
#[derive(Debug, Clone, Serialize)]
pub struct TableDef {
    pub id: TableId,
    pub name: String,
    pub parent: Option<TableId>,
    pub fields: Vec<FieldDef>,
    /// 主键列位置
    pub pk_fields: Vec<usize>,
    /// 引用父表主键的列位置；为空表示父子关系只体现在 HKey 中
    pub parent_join_fields: Vec<usize>,
    pub label: HierarchyLabel,
}

impl TableDef {
    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// 组定义
#[derive(Debug, Clone, Serialize)]
pub struct GroupDef {
    pub id: GroupId,
    pub name: String,
    pub root: TableId,
    /// 按先序排列的组内表
    pub tables: Vec<TableId>,
}
