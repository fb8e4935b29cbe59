//! 选择游标
//!
//! 谓词只对谓词类型的行求值，结果缓存下来并施加到该行的所有后代上。
//! 缓存行不再是当前行的祖先时缓存失效，此后的后代行默认被排除。
//! 与谓词类型无关的行（祖先类型、其他分支）原样通过。

use std::sync::Arc;

use log::trace;

use super::{Cursor, CursorState, Lifecycle};
use crate::core::error::DBResult;
use crate::core::expression::RowPredicate;
use crate::core::row::RowRef;
use crate::core::schema::{HKey, RowType};

pub struct SelectCursor {
    lifecycle: Lifecycle,
    input: Box<dyn Cursor>,
    predicate_type: Arc<RowType>,
    predicate: Box<dyn RowPredicate>,
    /// 最近一个谓词类型行及其判定结果
    cached: Option<(RowRef, bool)>,
}

impl SelectCursor {
    pub fn new(
        input: Box<dyn Cursor>,
        predicate_type: Arc<RowType>,
        predicate: Box<dyn RowPredicate>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(format!("Select({})", predicate_type.name())),
            input,
            predicate_type,
            predicate,
            cached: None,
        }
    }

    fn keep(&mut self, row: &RowRef) -> DBResult<bool> {
        let row_type = row.row_type();
        if row_type.is(&self.predicate_type) {
            let selected = self.predicate.test(row)?;
            trace!("{}: {} -> {}", self.lifecycle.name(), row, selected);
            self.cached = Some((Arc::clone(row), selected));
            return Ok(selected);
        }
        if !self.predicate_type.ancestor_of(row_type) {
            return Ok(true);
        }
        match &self.cached {
            Some((cached, selected)) if cached.ancestor_of(row) => Ok(*selected),
            Some(_) => {
                trace!("{}: {} 离开缓存行的子树, 缓存失效", self.lifecycle.name(), row);
                self.cached = None;
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

impl Cursor for SelectCursor {
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
        self.cached = None;
        self.lifecycle.activate();
        Ok(())
    }

    fn next(&mut self) -> DBResult<Option<RowRef>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        while let Some(row) = self.input.next()? {
            if self.keep(&row)? {
                return Ok(Some(row));
            }
        }
        self.lifecycle.exhaust();
        Ok(None)
    }

    fn jump(&mut self, key: &HKey) -> DBResult<()> {
        self.lifecycle.check_jump()?;
        self.input.jump(key)?;
        self.cached = None;
        self.lifecycle.activate();
        Ok(())
    }

    fn close(&mut self) {
        self.input.close();
        self.cached = None;
        self.lifecycle.close();
    }
}
