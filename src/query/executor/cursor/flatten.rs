//! 扁平化游标
//!
//! 输入按 HKey 有序，父类型行之后紧跟它的后代行。每遇到一个子类型行，
//! 与当前父行组合成扁平行输出。其他类型的行原样通过。
//!
//! 没有子行的父行按 LEFT/FULL 语义输出一个子侧为 NULL 的扁平行，其 HKey 为
//! 父行 HKey 加 NULL 子表段；一旦输入行的 HKey 越过该键就立即输出，保证输出仍按
//! HKey 有序。没有父行的孤儿子行按 RIGHT/FULL 语义输出父侧为 NULL 的扁平行。

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use log::{trace, warn};

use super::{Cursor, CursorState, Lifecycle};
use crate::core::error::{DBResult, RowError, RowResult};
use crate::core::row::{null_child_hkey, FlattenedRow, Row, RowRef};
use crate::core::schema::{HKey, RowType, Schema};

/// 扁平化连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenJoinType {
    Inner,
    /// 保留没有子行的父行
    Left,
    /// 保留没有父行的子行
    Right,
    Full,
}

impl FlattenJoinType {
    fn keeps_childless_parent(self) -> bool {
        matches!(self, FlattenJoinType::Left | FlattenJoinType::Full)
    }

    fn keeps_orphan_child(self) -> bool {
        matches!(self, FlattenJoinType::Right | FlattenJoinType::Full)
    }
}

impl fmt::Display for FlattenJoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenJoinType::Inner => write!(f, "INNER"),
            FlattenJoinType::Left => write!(f, "LEFT"),
            FlattenJoinType::Right => write!(f, "RIGHT"),
            FlattenJoinType::Full => write!(f, "FULL"),
        }
    }
}

/// 扁平化选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    pub join_type: FlattenJoinType,
    /// 父行本身也输出（在其扁平行之前）
    pub keep_parent: bool,
    /// 子行本身也输出（在其扁平行之后）
    pub keep_child: bool,
}

impl FlattenOptions {
    pub fn new(join_type: FlattenJoinType) -> Self {
        Self {
            join_type,
            keep_parent: false,
            keep_child: false,
        }
    }

    pub fn keep_parent(mut self) -> Self {
        self.keep_parent = true;
        self
    }

    pub fn keep_child(mut self) -> Self {
        self.keep_child = true;
        self
    }
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self::new(FlattenJoinType::Inner)
    }
}

pub struct FlattenCursor {
    lifecycle: Lifecycle,
    input: Box<dyn Cursor>,
    row_type: Arc<RowType>,
    parent_type: Arc<RowType>,
    child_type: Arc<RowType>,
    options: FlattenOptions,
    parent: Option<RowRef>,
    /// 当前父行尚未遇到子行时，NULL 子侧扁平行的 HKey
    left_join_hkey: Option<HKey>,
    pending: VecDeque<RowRef>,
    pending_limit: usize,
    input_done: bool,
}

impl FlattenCursor {
    /// parent_type 必须是 child_type 的直接父类型
    pub fn new(
        schema: &Schema,
        input: Box<dyn Cursor>,
        parent_type: Arc<RowType>,
        child_type: Arc<RowType>,
        options: FlattenOptions,
    ) -> RowResult<Self> {
        if !parent_type.parent_of(&child_type) {
            return Err(RowError::InvalidSyntheticType(format!(
                "flatten({}, {}): 不是父子关系",
                parent_type.name(),
                child_type.name()
            )));
        }
        let row_type = schema.new_flatten_type(&parent_type, &child_type)?;
        Ok(Self {
            lifecycle: Lifecycle::new(format!("Flatten({} {})", row_type.name(), options.join_type)),
            input,
            row_type,
            parent_type,
            child_type,
            options,
            parent: None,
            left_join_hkey: None,
            pending: VecDeque::new(),
            pending_limit: 1024,
            input_done: false,
        })
    }

    /// 待输出队列超过该长度时告警
    pub fn with_pending_limit(mut self, limit: usize) -> Self {
        self.pending_limit = limit.max(1);
        self
    }

    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    fn push(&mut self, row: RowRef) {
        self.pending.push_back(row);
        if self.pending.len() == self.pending_limit + 1 {
            warn!(
                "{}: 待输出行数超过 {}",
                self.lifecycle.name(),
                self.pending_limit
            );
        }
    }

    fn flatten(&self, parent: Option<RowRef>, child: Option<RowRef>) -> DBResult<RowRef> {
        let row = FlattenedRow::new(Arc::clone(&self.row_type), parent, child)?;
        Ok(Arc::new(Row::from(row)))
    }

    /// 输入推进到 upto 时，若已越过 NULL 子侧扁平行的 HKey，先输出该行
    ///
    /// upto 为 None 表示输入结束。
    fn release_left_join(&mut self, upto: Option<&HKey>) -> DBResult<()> {
        let passed = match (&self.left_join_hkey, upto) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(key), Some(upto)) => upto > key,
        };
        if !passed {
            return Ok(());
        }
        self.left_join_hkey = None;
        if let Some(parent) = self.parent.clone() {
            let row = self.flatten(Some(parent), None)?;
            self.push(row);
        }
        Ok(())
    }

    fn consume(&mut self, row: RowRef) -> DBResult<()> {
        let row_type = Arc::clone(row.row_type());
        let parent = self
            .parent
            .as_ref()
            .filter(|p| row_type.is(&self.child_type) && p.ancestor_of(&row))
            .cloned();
        if let Some(parent) = parent {
            self.left_join_hkey = None;
            let flattened = self.flatten(Some(parent), Some(Arc::clone(&row)))?;
            self.push(flattened);
            if self.options.keep_child {
                self.push(row);
            }
            return Ok(());
        }

        if let Some(key) = row.hkey() {
            self.release_left_join(Some(key))?;
        }
        if row_type.is(&self.parent_type) {
            if self.options.keep_parent {
                self.push(Arc::clone(&row));
            }
            self.left_join_hkey = if self.options.join_type.keeps_childless_parent() {
                row.hkey()
                    .and_then(|k| null_child_hkey(k, &self.child_type))
            } else {
                None
            };
            self.parent = Some(row);
        } else if row_type.is(&self.child_type) {
            trace!("{}: 孤儿子行 {}", self.lifecycle.name(), row);
            if self.options.join_type.keeps_orphan_child() {
                let flattened = self.flatten(None, Some(Arc::clone(&row)))?;
                self.push(flattened);
            }
            if self.options.keep_child {
                self.push(row);
            }
        } else {
            self.push(row);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.parent = None;
        self.left_join_hkey = None;
        self.pending.clear();
        self.input_done = false;
    }
}

impl Cursor for FlattenCursor {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn open(&mut self) -> DBResult<()> {
        self.lifecycle.check_open()?;
        if self.input.state() == CursorState::Active {
            self.input.close();
        }
        self.input.open()?;
        self.reset();
        self.lifecycle.activate();
        Ok(())
    }

    fn next(&mut self) -> DBResult<Option<RowRef>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.input_done {
                self.lifecycle.exhaust();
                return Ok(None);
            }
            match self.input.next()? {
                Some(row) => self.consume(row)?,
                None => {
                    self.release_left_join(None)?;
                    self.input_done = true;
                }
            }
        }
    }

    fn close(&mut self) {
        self.input.close();
        self.reset();
        self.lifecycle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DBError;
    use crate::core::schema::GroupId;
    use crate::query::executor::cursor::fixture::{self, describe};
    use crate::query::executor::cursor::{collect_rows, GroupScanCursor};

    fn flatten(f: &fixture::Fixture, options: FlattenOptions) -> FlattenCursor {
        let scan = GroupScanCursor::new(f.store(), GroupId(0));
        FlattenCursor::new(
            &f.schema,
            Box::new(scan),
            f.schema.table_type(f.customer).unwrap(),
            f.schema.table_type(f.order).unwrap(),
            options,
        )
        .unwrap()
    }

    fn assert_hkey_order(rows: &[RowRef]) {
        for pair in rows.windows(2) {
            let (a, b) = (pair[0].hkey().unwrap(), pair[1].hkey().unwrap());
            assert!(a <= b, "HKey 乱序: {} ({}) 之后是 {} ({})", pair[0], a, pair[1], b);
        }
    }

    #[test]
    fn test_inner_flatten() {
        let f = fixture::populated();
        let mut cursor = flatten(&f, FlattenOptions::new(FlattenJoinType::Inner));
        let rows = collect_rows(&mut cursor).unwrap();
        assert_eq!(
            describe(&rows),
            vec![
                "flatten(customer, order)[1, 11, 1]",
                "item[111, 11]",
                "item[112, 11]",
                "flatten(customer, order)[1, 12, 1]",
                "address[11, 1]",
                "address[21, 2]",
                "flatten(customer, order)[4, 41, 4]",
            ]
        );
    }

    #[test]
    fn test_full_flatten_emits_null_sides() {
        let f = fixture::populated();
        let mut cursor = flatten(&f, FlattenOptions::new(FlattenJoinType::Full));
        let rows = collect_rows(&mut cursor).unwrap();
        assert_eq!(
            describe(&rows),
            vec![
                "flatten(customer, order)[1, 11, 1]",
                "item[111, 11]",
                "item[112, 11]",
                "flatten(customer, order)[1, 12, 1]",
                "address[11, 1]",
                "flatten(customer, order)[2, NULL, NULL]",
                "address[21, 2]",
                "flatten(customer, order)[NULL, 31, 3]",
                "flatten(customer, order)[4, 41, 4]",
            ]
        );
        // 缺失子侧时 HKey 为父行加 NULL 子表段，缺失父侧时取子行
        assert_eq!(rows[5].hkey().unwrap().to_string(), "{0:(2),1:(NULL)}");
        assert_eq!(rows[7].hkey().unwrap().to_string(), "{0:(3),1:(31)}");
        assert_hkey_order(&rows);
    }

    #[test]
    fn test_left_flatten_keeps_hkey_order() {
        let f = fixture::populated();
        let scan = GroupScanCursor::new(f.store(), GroupId(0));
        // customer 与 address 的扁平化：没有 address 的 customer 3 已删除，customer 4 没有地址
        let mut cursor = FlattenCursor::new(
            &f.schema,
            Box::new(scan),
            f.schema.table_type(f.customer).unwrap(),
            f.schema.table_type(f.address).unwrap(),
            FlattenOptions::new(FlattenJoinType::Left),
        )
        .unwrap();
        let rows = collect_rows(&mut cursor).unwrap();
        assert_hkey_order(&rows);
        assert_eq!(
            describe(&rows).last().map(String::as_str),
            Some("flatten(customer, address)[4, NULL, NULL]")
        );
        assert_eq!(
            rows.last().unwrap().hkey().unwrap().to_string(),
            "{0:(4),3:(NULL)}"
        );
        // customer 4 的订单在 NULL 地址行之前
        let described = describe(&rows);
        let order_41 = described.iter().position(|r| r == "order[41, 4]").unwrap();
        assert_eq!(order_41, described.len() - 2);
    }

    #[test]
    fn test_left_flatten_keep_parent() {
        let f = fixture::populated();
        let mut cursor = flatten(&f, FlattenOptions::new(FlattenJoinType::Left).keep_parent());
        let rows = collect_rows(&mut cursor).unwrap();
        assert_eq!(
            describe(&rows),
            vec![
                "customer[1]",
                "flatten(customer, order)[1, 11, 1]",
                "item[111, 11]",
                "item[112, 11]",
                "flatten(customer, order)[1, 12, 1]",
                "address[11, 1]",
                "customer[2]",
                "flatten(customer, order)[2, NULL, NULL]",
                "address[21, 2]",
                "customer[4]",
                "flatten(customer, order)[4, 41, 4]",
            ]
        );
    }

    #[test]
    fn test_right_flatten_keep_child() {
        let f = fixture::populated();
        let mut cursor = flatten(&f, FlattenOptions::new(FlattenJoinType::Right).keep_child());
        let rows = collect_rows(&mut cursor).unwrap();
        let described = describe(&rows);
        assert_eq!(
            &described[..3],
            &[
                "flatten(customer, order)[1, 11, 1]".to_string(),
                "order[11, 1]".to_string(),
                "item[111, 11]".to_string(),
            ]
        );
        assert!(described.contains(&"flatten(customer, order)[NULL, 31, 3]".to_string()));
        assert!(described.contains(&"order[31, 3]".to_string()));
        assert!(!described.iter().any(|r| r.contains("[2, NULL")));
    }

    #[test]
    fn test_non_parent_child_rejected() {
        let f = fixture::populated();
        let scan = GroupScanCursor::new(f.store(), GroupId(0));
        let result = FlattenCursor::new(
            &f.schema,
            Box::new(scan),
            f.schema.table_type(f.customer).unwrap(),
            f.schema.table_type(f.item).unwrap(),
            FlattenOptions::default(),
        );
        assert!(matches!(result, Err(RowError::InvalidSyntheticType(_))));
    }

    #[test]
    fn test_jump_unsupported() {
        let f = fixture::populated();
        let mut cursor = flatten(&f, FlattenOptions::default());
        cursor.open().unwrap();
        let key = crate::core::schema::HKey::root(0, vec![crate::core::value::Value::Int32(1)]);
        let err = cursor.jump(&key).unwrap_err();
        assert!(matches!(
            err,
            DBError::Cursor(crate::core::error::CursorError::JumpUnsupported(_))
        ));
        cursor.close();
    }
}
