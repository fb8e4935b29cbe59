use crate::core::error::{StorageError, StorageResult};
use crate::core::row::RowRef;
use crate::core::schema::{GroupId, HKey, TableId};

/// 行源
///
/// 按键序产出行。`next()` 是唯一可能阻塞的调用；`close()` 必须释放 `open()` 获取的资源，
/// 即使 `next()` 从未被调用。行源从不在内部重试 I/O 失败。
pub trait RowSource: Send {
    fn open(&mut self) -> StorageResult<()>;

    fn next(&mut self) -> StorageResult<Option<RowRef>>;

    /// 重新定位到 key（含）之后的第一行
    fn seek(&mut self, key: &HKey) -> StorageResult<()> {
        Err(StorageError::NotSupported(format!("seek {}", key)))
    }

    fn close(&mut self);
}

/// 索引定义：单表上若干列的有序索引
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: String,
    pub table: TableId,
    /// 索引列位置，按索引顺序
    pub columns: Vec<usize>,
}

/// 组存储：组扫描与索引扫描行源的工厂
pub trait GroupStore: Send + Sync {
    /// 组扫描；给定 bound 时只产出 HKey 以 bound 为前缀的行（包括孤儿后代）
    fn group_scan(&self, group: GroupId, bound: Option<HKey>) -> StorageResult<Box<dyn RowSource>>;

    /// 按索引顺序产出被索引表的行
    fn index_scan(&self, index: &str) -> StorageResult<Box<dyn RowSource>>;

    fn index_def(&self, index: &str) -> StorageResult<IndexDef>;
}
