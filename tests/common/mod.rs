//! 集成测试共享工具模块
//!
//! customer / order / item / address 组：
//! customer 是根表，order 与 address 是 customer 的子表，item 是 order 的子表。

#![allow(dead_code)]

use std::sync::Arc;

use groupdb::core::row::{RowRef, TableRow};
use groupdb::core::schema::{FieldDef, GroupId, HKey, Schema, SchemaBuilder, TableId};
use groupdb::core::value::{DataType, FieldType, Value};
use groupdb::storage::{GroupStore, IndexDef, MemoryGroupStore};

pub const GROUP: GroupId = GroupId(0);

pub struct TestGroup {
    pub schema: Arc<Schema>,
    pub store: Arc<MemoryGroupStore>,
    pub customer: TableId,
    pub order: TableId,
    pub item: TableId,
    pub address: TableId,
}

impl TestGroup {
    pub fn new() -> Self {
        let mut b = SchemaBuilder::new(1);
        let customer = b
            .root_table(
                "customer",
                vec![
                    FieldDef::new("cid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("name", FieldType::nullable(DataType::String)),
                ],
                vec![0],
            )
            .expect("customer");
        let order = b
            .child_table(
                "order",
                customer,
                vec![
                    FieldDef::new("oid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("cid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("order_date", FieldType::nullable(DataType::Date)),
                ],
                vec![0],
                vec![1],
            )
            .expect("order");
        let item = b
            .child_table(
                "item",
                order,
                vec![
                    FieldDef::new("iid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("oid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("quantity", FieldType::nullable(DataType::Int32)),
                ],
                vec![0],
                vec![1],
            )
            .expect("item");
        let address = b
            .child_table(
                "address",
                customer,
                vec![
                    FieldDef::new("aid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("cid", FieldType::not_null(DataType::Int64)),
                    FieldDef::new("state", FieldType::nullable(DataType::String)),
                ],
                vec![0],
                vec![1],
            )
            .expect("address");
        let schema = Arc::new(b.build().expect("schema"));
        Self {
            store: Arc::new(MemoryGroupStore::new(Arc::clone(&schema))),
            schema,
            customer,
            order,
            item,
            address,
        }
    }

    pub fn store(&self) -> Arc<dyn GroupStore> {
        self.store.clone()
    }

    pub fn insert(&self, table: TableId, parent: Option<&HKey>, values: Vec<Value>) -> HKey {
        let hkey = self
            .schema
            .row_hkey(table, parent, &values)
            .expect("计算 HKey 失败");
        let row = TableRow::new(
            self.schema.table_type(table).expect("表类型"),
            hkey.clone(),
            values,
        )
        .expect("构造表行失败");
        self.store.insert(row).expect("插入失败");
        hkey
    }

    pub fn create_index(&self, name: &str, table: TableId, columns: Vec<usize>) {
        self.store
            .create_index(IndexDef {
                name: name.to_string(),
                table,
                columns,
            })
            .expect("创建索引失败");
    }
}

pub fn customer(cid: i64, name: &str) -> Vec<Value> {
    vec![Value::Int64(cid), Value::from(name)]
}

pub fn order(oid: i64, cid: i64, date: (i32, u32, u32)) -> Vec<Value> {
    vec![
        Value::Int64(oid),
        Value::Int64(cid),
        Value::date(date.0, date.1, date.2),
    ]
}

pub fn item(iid: i64, oid: i64, quantity: i32) -> Vec<Value> {
    vec![Value::Int64(iid), Value::Int64(oid), Value::Int32(quantity)]
}

pub fn address(aid: i64, cid: i64, state: &str) -> Vec<Value> {
    vec![Value::Int64(aid), Value::Int64(cid), Value::from(state)]
}

/// 标准数据集
///
/// - 1 'alice': 订单 101 (明细 1001, 1002), 订单 102; 地址 11 'MA'
/// - 2 'bob': 地址 21 'NY'
/// - 3 已删除, 留下孤儿订单 301 (明细 3001)
/// - 4 'dave': 订单 401
pub fn populated() -> TestGroup {
    let g = TestGroup::new();
    let c1 = g.insert(g.customer, None, customer(1, "alice"));
    let o101 = g.insert(g.order, Some(&c1), order(101, 1, (2024, 1, 15)));
    g.insert(g.item, Some(&o101), item(1001, 101, 2));
    g.insert(g.item, Some(&o101), item(1002, 101, 5));
    g.insert(g.order, Some(&c1), order(102, 1, (2024, 3, 2)));
    g.insert(g.address, Some(&c1), address(11, 1, "MA"));
    let c2 = g.insert(g.customer, None, customer(2, "bob"));
    g.insert(g.address, Some(&c2), address(21, 2, "NY"));
    let c3 = g.insert(g.customer, None, customer(3, "carol"));
    let o301 = g.insert(g.order, Some(&c3), order(301, 3, (2023, 12, 24)));
    g.insert(g.item, Some(&o301), item(3001, 301, 1));
    g.store.delete(&c3).expect("删除失败");
    let c4 = g.insert(g.customer, None, customer(4, "dave"));
    g.insert(g.order, Some(&c4), order(401, 4, (2024, 2, 29)));
    g
}

pub fn describe(rows: &[RowRef]) -> Vec<String> {
    rows.iter().map(|r| r.to_string()).collect()
}

pub fn hkeys(rows: &[RowRef]) -> Vec<String> {
    rows.iter()
        .map(|r| r.hkey().map(|k| k.to_string()).unwrap_or_default())
        .collect()
}

/// 断言行按 HKey 非递减输出
pub fn assert_hkey_order(rows: &[RowRef]) {
    for pair in rows.windows(2) {
        let (a, b) = (pair[0].hkey(), pair[1].hkey());
        assert!(a <= b, "HKey 乱序: {} ({:?}) 之后是 {} ({:?})", pair[0], a, pair[1], b);
    }
}
