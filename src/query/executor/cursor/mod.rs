//! 游标模型
//!
//! 游标按键序产出行，生命周期为 CLOSED → ACTIVE ⇄ IDLE → CLOSED：
//! - `open()` 只能从 CLOSED 或 IDLE 调用，对 ACTIVE 游标调用是调用方错误
//! - `next()` 在 CLOSED 状态下失败，IDLE 状态下反复返回 `None`
//! - `close()` 任何状态下都可调用且幂等
//!
//! 组合游标独占其子游标，打开顺序由外到内，关闭顺序由内到外。

pub mod cancel;
pub mod flatten;
pub mod product;
pub mod scan;
pub mod select;

pub use cancel::CancellableCursor;
pub use flatten::{FlattenCursor, FlattenJoinType, FlattenOptions};
pub use product::ProductCursor;
pub use scan::{GroupScanCursor, IndexScanCursor, ValuesScanCursor};
pub use select::SelectCursor;

use std::fmt;

use log::debug;

use crate::core::error::{CursorError, CursorResult, DBResult};
use crate::core::row::RowRef;
use crate::core::schema::HKey;

/// 游标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Closed,
    Active,
    /// 已打开但已耗尽
    Idle,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorState::Closed => write!(f, "CLOSED"),
            CursorState::Active => write!(f, "ACTIVE"),
            CursorState::Idle => write!(f, "IDLE"),
        }
    }
}

/// 游标
pub trait Cursor: Send {
    fn name(&self) -> &str;

    fn state(&self) -> CursorState;

    fn open(&mut self) -> DBResult<()>;

    /// 下一行；耗尽时返回 `None` 并进入 IDLE
    fn next(&mut self) -> DBResult<Option<RowRef>>;

    /// 不重新打开而直接定位到 key
    ///
    /// 不支持的游标必须显式失败。
    fn jump(&mut self, key: &HKey) -> DBResult<()> {
        Err(CursorError::JumpUnsupported(format!("{} -> {}", self.name(), key)).into())
    }

    fn close(&mut self);
}

/// 状态机的公共部分，各游标内嵌使用
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    name: String,
    state: CursorState,
}

impl Lifecycle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: CursorState::Closed,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> CursorState {
        self.state
    }

    pub(crate) fn check_open(&self) -> CursorResult<()> {
        if self.state == CursorState::Active {
            return Err(CursorError::AlreadyActive(self.name.clone()));
        }
        Ok(())
    }

    /// next 前检查：CLOSED 报错，IDLE 返回 false
    pub(crate) fn check_next(&self) -> CursorResult<bool> {
        match self.state {
            CursorState::Closed => Err(CursorError::NotOpen(self.name.clone())),
            CursorState::Idle => Ok(false),
            CursorState::Active => Ok(true),
        }
    }

    pub(crate) fn check_jump(&self) -> CursorResult<()> {
        if self.state == CursorState::Closed {
            return Err(CursorError::NotOpen(self.name.clone()));
        }
        Ok(())
    }

    pub(crate) fn activate(&mut self) {
        if self.state == CursorState::Closed {
            debug!("打开游标 {}", self.name);
        }
        self.state = CursorState::Active;
    }

    pub(crate) fn exhaust(&mut self) {
        self.state = CursorState::Idle;
    }

    pub(crate) fn close(&mut self) {
        if self.state != CursorState::Closed {
            debug!("关闭游标 {}", self.name);
        }
        self.state = CursorState::Closed;
    }
}

/// 打开游标，读完全部行后关闭
pub fn collect_rows(cursor: &mut dyn Cursor) -> DBResult<Vec<RowRef>> {
    cursor.open()?;
    let mut rows = Vec::new();
    loop {
        match cursor.next() {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break,
            Err(e) => {
                cursor.close();
                return Err(e);
            }
        }
    }
    cursor.close();
    Ok(rows)
}

#[cfg(test)]
pub(crate) mod fixture {
    //! 游标测试共用的 customer/order/item/address 组

    use std::sync::Arc;

    use crate::core::row::{RowRef, TableRow};
    use crate::core::schema::{FieldDef, HKey, Schema, SchemaBuilder, TableId};
    use crate::core::value::{DataType, FieldType, Value};
    use crate::storage::{GroupStore, MemoryGroupStore};

    pub struct Fixture {
        pub schema: Arc<Schema>,
        pub store: Arc<MemoryGroupStore>,
        pub customer: TableId,
        pub order: TableId,
        pub item: TableId,
        pub address: TableId,
    }

    impl Fixture {
        pub fn store(&self) -> Arc<dyn GroupStore> {
            self.store.clone()
        }

        pub fn insert(&self, table: TableId, parent: Option<&HKey>, values: Vec<i32>) -> HKey {
            let values: Vec<Value> = values.into_iter().map(Value::Int32).collect();
            let hkey = self.schema.row_hkey(table, parent, &values).unwrap();
            let row = TableRow::new(self.schema.table_type(table).unwrap(), hkey.clone(), values)
                .unwrap();
            self.store.insert(row).unwrap();
            hkey
        }
    }

    fn int(name: &str) -> FieldDef {
        FieldDef::new(name, FieldType::not_null(DataType::Int32))
    }

    /// 空组
    pub fn empty() -> Fixture {
        let mut b = SchemaBuilder::new(1);
        let customer = b.root_table("customer", vec![int("cid")], vec![0]).unwrap();
        let order = b
            .child_table("order", customer, vec![int("oid"), int("cid")], vec![0], vec![1])
            .unwrap();
        let item = b
            .child_table("item", order, vec![int("iid"), int("oid")], vec![0], vec![1])
            .unwrap();
        let address = b
            .child_table("address", customer, vec![int("aid"), int("cid")], vec![0], vec![1])
            .unwrap();
        let schema = Arc::new(b.build().unwrap());
        Fixture {
            store: Arc::new(MemoryGroupStore::new(Arc::clone(&schema))),
            schema,
            customer,
            order,
            item,
            address,
        }
    }

    /// c1: o11(i111, i112), o12, a11
    /// c2: a21
    /// c3 已删除，留下孤儿订单 o31
    /// c4: o41
    pub fn populated() -> Fixture {
        let f = empty();
        let c1 = f.insert(f.customer, None, vec![1]);
        let o11 = f.insert(f.order, Some(&c1), vec![11, 1]);
        f.insert(f.item, Some(&o11), vec![111, 11]);
        f.insert(f.item, Some(&o11), vec![112, 11]);
        f.insert(f.order, Some(&c1), vec![12, 1]);
        f.insert(f.address, Some(&c1), vec![11, 1]);
        let c2 = f.insert(f.customer, None, vec![2]);
        f.insert(f.address, Some(&c2), vec![21, 2]);
        let c3 = f.insert(f.customer, None, vec![3]);
        f.insert(f.order, Some(&c3), vec![31, 3]);
        f.store.delete(&c3).unwrap();
        let c4 = f.insert(f.customer, None, vec![4]);
        f.insert(f.order, Some(&c4), vec![41, 4]);
        f
    }

    pub fn hkeys(rows: &[RowRef]) -> Vec<String> {
        rows.iter()
            .map(|r| r.hkey().map(|k| k.to_string()).unwrap_or_default())
            .collect()
    }

    pub fn describe(rows: &[RowRef]) -> Vec<String> {
        rows.iter().map(|r| r.to_string()).collect()
    }
}
