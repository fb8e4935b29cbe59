//! 可取消游标
//!
//! 包在游标树最外层，两次 `next()` 之间检查查询上下文的终止标志。
//! 发现终止时由外向内关闭整棵树并返回 `Cancelled`。

use std::sync::Arc;

use log::info;

use super::{Cursor, CursorState, Lifecycle};
use crate::core::error::{CursorError, DBResult};
use crate::core::row::RowRef;
use crate::core::schema::HKey;
use crate::query::query_context::QueryContext;

pub struct CancellableCursor {
    lifecycle: Lifecycle,
    input: Box<dyn Cursor>,
    ctx: Arc<QueryContext>,
}

impl CancellableCursor {
    pub fn new(input: Box<dyn Cursor>, ctx: Arc<QueryContext>) -> Self {
        Self {
            lifecycle: Lifecycle::new(format!("Cancellable({})", input.name())),
            input,
            ctx,
        }
    }

    fn cancel(&mut self) -> DBResult<Option<RowRef>> {
        info!("查询 {} 已取消, 关闭 {}", self.ctx.id(), self.lifecycle.name());
        self.close();
        Err(CursorError::Cancelled.into())
    }
}

impl Cursor for CancellableCursor {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn open(&mut self) -> DBResult<()> {
        self.lifecycle.check_open()?;
        if self.ctx.is_killed() {
            return Err(CursorError::Cancelled.into());
        }
        if self.input.state() == CursorState::Active {
            self.input.close();
        }
        self.input.open()?;
        self.lifecycle.activate();
        Ok(())
    }

    fn next(&mut self) -> DBResult<Option<RowRef>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        if self.ctx.is_killed() {
            return self.cancel();
        }
        let row = self.input.next()?;
        if row.is_none() {
            self.lifecycle.exhaust();
        }
        Ok(row)
    }

    fn jump(&mut self, key: &HKey) -> DBResult<()> {
        self.lifecycle.check_jump()?;
        if self.ctx.is_killed() {
            self.cancel()?;
        }
        self.input.jump(key)?;
        self.lifecycle.activate();
        Ok(())
    }

    fn close(&mut self) {
        self.input.close();
        self.lifecycle.close();
    }
}
