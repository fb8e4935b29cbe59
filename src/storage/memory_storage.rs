//! 内存组存储
//!
//! 每个组一棵按 HKey 排序的 BTreeMap，父行与其后代行按键交错存放；
//! 二级索引按 (索引键, HKey) 排序。组扫描行源每次在读锁下取一批
//! （至多 `SCAN_BATCH` 行），批与批之间不持有锁；`seek()` 只丢弃当前批，
//! 不复制组内剩余的行。索引扫描行源在 `open()` 时取快照。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;

use super::storage_engine::{GroupStore, IndexDef, RowSource};
use crate::core::error::{StorageError, StorageResult};
use crate::core::row::{Row, RowRef, TableRow};
use crate::core::schema::{GroupId, HKey, Schema};
use crate::core::value::Value;

/// 组扫描每批读取的行数
const SCAN_BATCH: usize = 64;

type GroupData = BTreeMap<HKey, RowRef>;
type IndexData = BTreeMap<(Vec<Value>, HKey), RowRef>;

struct MemoryIndex {
    def: IndexDef,
    entries: IndexData,
}

/// 内存组存储
pub struct MemoryGroupStore {
    schema: Arc<Schema>,
    groups: Arc<RwLock<HashMap<GroupId, GroupData>>>,
    indexes: Arc<RwLock<HashMap<String, MemoryIndex>>>,
}

impl std::fmt::Debug for MemoryGroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGroupStore")
            .field("schema_version", &self.schema.version())
            .field("groups", &self.groups.read().len())
            .field("indexes", &self.indexes.read().len())
            .finish()
    }
}

impl MemoryGroupStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            groups: Arc::new(RwLock::new(HashMap::new())),
            indexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn index_key(def: &IndexDef, row: &Row) -> StorageResult<Vec<Value>> {
        def.columns
            .iter()
            .map(|&c| {
                row.value(c)
                    .cloned()
                    .map_err(|e| StorageError::InvalidInput(e.to_string()))
            })
            .collect()
    }

    /// 写入一行；同一 HKey 已存在时报错
    pub fn insert(&self, row: TableRow) -> StorageResult<()> {
        let row: RowRef = Arc::new(Row::Table(row));
        let hkey = row
            .hkey()
            .cloned()
            .ok_or_else(|| StorageError::InvalidInput("表行缺少 HKey".to_string()))?;
        let label = row
            .row_type()
            .hierarchy_label()
            .ok_or_else(|| StorageError::InvalidInput(row.row_type().name().to_string()))?;
        let table = row.row_type().table();

        let mut groups = self.groups.write();
        let data = groups.entry(label.group).or_default();
        if data.contains_key(&hkey) {
            return Err(StorageError::InvalidInput(format!("重复的 HKey {}", hkey)));
        }

        let mut indexes = self.indexes.write();
        for index in indexes.values_mut() {
            if Some(index.def.table) == table {
                let key = Self::index_key(&index.def, &row)?;
                index.entries.insert((key, hkey.clone()), Arc::clone(&row));
            }
        }
        trace!("写入 {} at {}", row, hkey);
        data.insert(hkey, row);
        Ok(())
    }

    /// 删除一行（不级联删除后代，后代成为孤儿）
    pub fn delete(&self, hkey: &HKey) -> StorageResult<RowRef> {
        let mut groups = self.groups.write();
        let removed = groups
            .values_mut()
            .find_map(|data| data.remove(hkey))
            .ok_or_else(|| StorageError::NotFound(hkey.to_string()))?;
        let mut indexes = self.indexes.write();
        for index in indexes.values_mut() {
            index.entries.retain(|(_, key), _| key != hkey);
        }
        Ok(removed)
    }

    /// 建立索引并回填已有行
    pub fn create_index(&self, def: IndexDef) -> StorageResult<()> {
        let table = self
            .schema
            .table(def.table)
            .map_err(|e| StorageError::InvalidInput(e.to_string()))?;
        if def.columns.is_empty() || def.columns.iter().any(|&c| c >= table.n_fields()) {
            return Err(StorageError::InvalidInput(format!(
                "索引 {} 的列不合法",
                def.name
            )));
        }
        // 加锁顺序与写入路径一致：先组后索引
        let groups = self.groups.read();
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&def.name) {
            return Err(StorageError::InvalidInput(format!("索引 {} 已存在", def.name)));
        }

        let mut entries = IndexData::new();
        if let Some(data) = groups.get(&table.label.group) {
            for (hkey, row) in data.iter() {
                if row.row_type().table() == Some(def.table) {
                    let key = Self::index_key(&def, row)?;
                    entries.insert((key, hkey.clone()), Arc::clone(row));
                }
            }
        }
        debug!("创建索引 {} ({} 条)", def.name, entries.len());
        indexes.insert(def.name.clone(), MemoryIndex { def, entries });
        Ok(())
    }

    pub fn row_count(&self, group: GroupId) -> usize {
        self.groups.read().get(&group).map(|d| d.len()).unwrap_or(0)
    }
}

impl GroupStore for MemoryGroupStore {
    fn group_scan(&self, group: GroupId, bound: Option<HKey>) -> StorageResult<Box<dyn RowSource>> {
        if self.schema.groups().iter().all(|g| g.id != group) {
            return Err(StorageError::NotFound(format!("group {}", group.0)));
        }
        Ok(Box::new(GroupScanSource {
            groups: Arc::clone(&self.groups),
            group,
            bound,
            buffer: VecDeque::new(),
            resume: None,
            open: false,
        }))
    }

    fn index_scan(&self, index: &str) -> StorageResult<Box<dyn RowSource>> {
        if !self.indexes.read().contains_key(index) {
            return Err(StorageError::NotFound(format!("index {}", index)));
        }
        Ok(Box::new(IndexScanSource {
            indexes: Arc::clone(&self.indexes),
            index: index.to_string(),
            buffer: VecDeque::new(),
            open: false,
        }))
    }

    fn index_def(&self, index: &str) -> StorageResult<IndexDef> {
        self.indexes
            .read()
            .get(index)
            .map(|i| i.def.clone())
            .ok_or_else(|| StorageError::NotFound(format!("index {}", index)))
    }
}

/// 组扫描行源
struct GroupScanSource {
    groups: Arc<RwLock<HashMap<GroupId, GroupData>>>,
    group: GroupId,
    bound: Option<HKey>,
    buffer: VecDeque<RowRef>,
    /// 下一批的起点；None 表示已读到组尾或 bound 之外
    resume: Option<Bound<HKey>>,
    open: bool,
}

impl GroupScanSource {
    fn reposition(&mut self, start: Bound<HKey>) {
        self.buffer.clear();
        self.resume = Some(start);
    }

    fn fill_batch(&mut self) {
        let Some(start) = self.resume.take() else {
            return;
        };
        let groups = self.groups.read();
        let Some(data) = groups.get(&self.group) else {
            return;
        };
        for (key, row) in data.range::<HKey, _>((start.as_ref(), Bound::Unbounded)) {
            if let Some(bound) = &self.bound {
                // 有序存储中，以 bound 为前缀的键连续排列
                if !bound.is_prefix_of(key) {
                    return;
                }
            }
            if self.buffer.len() == SCAN_BATCH {
                self.resume = Some(Bound::Included(key.clone()));
                return;
            }
            self.buffer.push_back(Arc::clone(row));
        }
    }
}

impl RowSource for GroupScanSource {
    fn open(&mut self) -> StorageResult<()> {
        let start = match &self.bound {
            Some(key) => Bound::Included(key.clone()),
            None => Bound::Unbounded,
        };
        self.reposition(start);
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> StorageResult<Option<RowRef>> {
        if !self.open {
            return Err(StorageError::Io("行源未打开".to_string()));
        }
        if self.buffer.is_empty() {
            self.fill_batch();
        }
        Ok(self.buffer.pop_front())
    }

    fn seek(&mut self, key: &HKey) -> StorageResult<()> {
        if !self.open {
            return Err(StorageError::Io("行源未打开".to_string()));
        }
        let start = match &self.bound {
            Some(bound) if key < bound => bound.clone(),
            _ => key.clone(),
        };
        self.reposition(Bound::Included(start));
        Ok(())
    }

    fn close(&mut self) {
        self.buffer.clear();
        self.resume = None;
        self.open = false;
    }
}

/// 索引扫描行源
struct IndexScanSource {
    indexes: Arc<RwLock<HashMap<String, MemoryIndex>>>,
    index: String,
    buffer: VecDeque<RowRef>,
    open: bool,
}

impl RowSource for IndexScanSource {
    fn open(&mut self) -> StorageResult<()> {
        let indexes = self.indexes.read();
        let index = indexes
            .get(&self.index)
            .ok_or_else(|| StorageError::NotFound(format!("index {}", self.index)))?;
        self.buffer = index.entries.values().cloned().collect();
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> StorageResult<Option<RowRef>> {
        if !self.open {
            return Err(StorageError::Io("行源未打开".to_string()));
        }
        Ok(self.buffer.pop_front())
    }

    fn close(&mut self) {
        self.buffer.clear();
        self.open = false;
    }
}
