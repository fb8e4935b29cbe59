//! 叶子游标：组扫描、索引扫描、常量行扫描

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, trace};

use super::{Cursor, CursorState, Lifecycle};
use crate::core::error::{CursorError, DBResult};
use crate::core::row::RowRef;
use crate::core::schema::{GroupId, HKey};
use crate::core::value::Value;
use crate::query::optimizer::range::RangeSegment;
use crate::storage::{GroupStore, IndexDef, RowSource, StorageError};

/// 打开行源；失败时先关闭，释放已获取的部分资源
fn open_source(source: &mut dyn RowSource) -> DBResult<()> {
    if let Err(e) = source.open() {
        source.close();
        return Err(e.into());
    }
    Ok(())
}

/// 组扫描游标
///
/// 给定 bound 时只产出 bound 之下的行。bound 对应的行本身不存在时，
/// 它的后代（孤儿行）照常产出。
pub struct GroupScanCursor {
    lifecycle: Lifecycle,
    store: Arc<dyn GroupStore>,
    group: GroupId,
    bound: Option<HKey>,
    source: Option<Box<dyn RowSource>>,
}

impl GroupScanCursor {
    pub fn new(store: Arc<dyn GroupStore>, group: GroupId) -> Self {
        Self {
            lifecycle: Lifecycle::new(format!("GroupScan(g{})", group.0)),
            store,
            group,
            bound: None,
            source: None,
        }
    }

    pub fn with_bound(mut self, bound: HKey) -> Self {
        self.lifecycle = Lifecycle::new(format!("GroupScan(g{}, {})", self.group.0, bound));
        self.bound = Some(bound);
        self
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }
}

impl Cursor for GroupScanCursor {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn open(&mut self) -> DBResult<()> {
        self.lifecycle.check_open()?;
        self.release();
        let mut source = self.store.group_scan(self.group, self.bound.clone())?;
        open_source(source.as_mut())?;
        self.source = Some(source);
        self.lifecycle.activate();
        Ok(())
    }

    fn next(&mut self) -> DBResult<Option<RowRef>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        let Some(source) = self.source.as_mut() else {
            return Err(CursorError::NotOpen(self.lifecycle.name().to_string()).into());
        };
        match source.next()? {
            Some(row) => {
                trace!("{} -> {}", self.lifecycle.name(), row);
                Ok(Some(row))
            }
            None => {
                self.lifecycle.exhaust();
                Ok(None)
            }
        }
    }

    fn jump(&mut self, key: &HKey) -> DBResult<()> {
        self.lifecycle.check_jump()?;
        if let Some(bound) = &self.bound {
            if !bound.is_prefix_of(key) {
                return Err(CursorError::InvalidJump(format!(
                    "{} 不在 {} 之下",
                    key,
                    self.lifecycle.name()
                ))
                .into());
            }
        }
        let Some(source) = self.source.as_mut() else {
            return Err(CursorError::NotOpen(self.lifecycle.name().to_string()).into());
        };
        source.seek(key)?;
        trace!("{} jump -> {}", self.lifecycle.name(), key);
        self.lifecycle.activate();
        Ok(())
    }

    fn close(&mut self) {
        self.release();
        self.lifecycle.close();
    }
}

/// 索引扫描游标
///
/// 按索引顺序产出被索引表的行。前若干索引列用等值约束，
/// 紧随其后的一列可以再用范围段约束。范围段必须已经排序合并。
pub struct IndexScanCursor {
    lifecycle: Lifecycle,
    store: Arc<dyn GroupStore>,
    index: String,
    equalities: Vec<Value>,
    ranges: Option<Vec<RangeSegment>>,
    def: Option<IndexDef>,
    source: Option<Box<dyn RowSource>>,
}

/// 单行相对扫描范围的位置
enum Position {
    Before,
    Inside,
    After,
}

impl IndexScanCursor {
    pub fn new(store: Arc<dyn GroupStore>, index: impl Into<String>) -> Self {
        let index = index.into();
        Self {
            lifecycle: Lifecycle::new(format!("IndexScan({})", index)),
            store,
            index,
            equalities: Vec::new(),
            ranges: None,
            def: None,
            source: None,
        }
    }

    /// 前缀等值约束
    pub fn with_equalities(mut self, values: Vec<Value>) -> Self {
        self.equalities = values;
        self
    }

    /// 等值前缀之后一列的范围约束
    pub fn with_ranges(mut self, segments: Vec<RangeSegment>) -> Self {
        self.ranges = Some(segments);
        self
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }
}

/// 行相对于等值前缀与范围段的位置
fn position(
    def: &IndexDef,
    equalities: &[Value],
    ranges: Option<&[RangeSegment]>,
    row: &RowRef,
) -> DBResult<Position> {
    for (i, expected) in equalities.iter().enumerate() {
        let Some(&column) = def.columns.get(i) else {
            break;
        };
        match row.value(column)?.compare_values(expected) {
            Some(Ordering::Less) | None => return Ok(Position::Before),
            Some(Ordering::Greater) => return Ok(Position::After),
            Some(Ordering::Equal) => {}
        }
    }
    let Some(segments) = ranges else {
        return Ok(Position::Inside);
    };
    let Some(&column) = def.columns.get(equalities.len()) else {
        return Ok(Position::Inside);
    };
    let value = row.value(column)?;
    if segments.iter().any(|s| s.contains(value)) {
        return Ok(Position::Inside);
    }
    match segments.last() {
        Some(last) if last.is_below(value) => Ok(Position::After),
        Some(_) => Ok(Position::Before),
        None => Ok(Position::After),
    }
}

impl Cursor for IndexScanCursor {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn open(&mut self) -> DBResult<()> {
        self.lifecycle.check_open()?;
        self.release();
        let def = self.store.index_def(&self.index)?;
        if self.equalities.len() > def.columns.len() {
            return Err(StorageError::InvalidInput(format!(
                "{}: {} 个等值约束超过索引列数 {}",
                self.index,
                self.equalities.len(),
                def.columns.len()
            ))
            .into());
        }
        let mut source = self.store.index_scan(&self.index)?;
        open_source(source.as_mut())?;
        debug!(
            "{}: 等值 {:?}, 范围 {}",
            self.lifecycle.name(),
            self.equalities,
            self.ranges
                .as_ref()
                .map(|r| r.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" OR "))
                .unwrap_or_else(|| "-".to_string())
        );
        self.def = Some(def);
        self.source = Some(source);
        self.lifecycle.activate();
        Ok(())
    }

    fn next(&mut self) -> DBResult<Option<RowRef>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        let (Some(def), Some(source)) = (self.def.as_ref(), self.source.as_mut()) else {
            return Err(CursorError::NotOpen(self.lifecycle.name().to_string()).into());
        };
        let found = loop {
            let Some(row) = source.next()? else {
                break None;
            };
            match position(def, &self.equalities, self.ranges.as_deref(), &row)? {
                Position::Before => continue,
                Position::Inside => break Some(row),
                // 索引有序，之后的行都超出范围
                Position::After => break None,
            }
        };
        if found.is_none() {
            self.lifecycle.exhaust();
        }
        Ok(found)
    }

    fn close(&mut self) {
        self.release();
        self.def = None;
        self.lifecycle.close();
    }
}

/// 常量行游标
pub struct ValuesScanCursor {
    lifecycle: Lifecycle,
    rows: Vec<RowRef>,
    pending: VecDeque<RowRef>,
}

impl ValuesScanCursor {
    pub fn new(rows: Vec<RowRef>) -> Self {
        Self {
            lifecycle: Lifecycle::new(format!("ValuesScan({} rows)", rows.len())),
            rows,
            pending: VecDeque::new(),
        }
    }
}

impl Cursor for ValuesScanCursor {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn open(&mut self) -> DBResult<()> {
        self.lifecycle.check_open()?;
        self.pending = self.rows.iter().cloned().collect();
        self.lifecycle.activate();
        Ok(())
    }

    fn next(&mut self) -> DBResult<Option<RowRef>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        let row = self.pending.pop_front();
        if row.is_none() {
            self.lifecycle.exhaust();
        }
        Ok(row)
    }

    fn close(&mut self) {
        self.pending.clear();
        self.lifecycle.close();
    }
}
