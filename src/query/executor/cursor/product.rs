//! 嵌套乘积游标
//!
//! 外侧输入中每遇到一个左类型行，把内侧游标 jump 到该行所在分支祖先的键，
//! 与分支下每个右类型行组合成乘积行。左类型行本身被消费，其他行原样通过。

use std::collections::VecDeque;
use std::sync::Arc;

use log::trace;

use super::{Cursor, CursorState, Lifecycle};
use crate::core::error::{DBResult, RowError, RowResult};
use crate::core::row::{ProductRow, Row, RowRef};
use crate::core::schema::{RowType, RowTypeKind};

pub struct ProductCursor {
    lifecycle: Lifecycle,
    outer: Box<dyn Cursor>,
    inner: Box<dyn Cursor>,
    row_type: Arc<RowType>,
    left_type: Arc<RowType>,
    right_type: Arc<RowType>,
    /// 分支祖先 HKey 的段数
    branch_key_depth: usize,
    pending: VecDeque<RowRef>,
}

impl ProductCursor {
    /// inner 必须支持 jump
    pub fn new(
        outer: Box<dyn Cursor>,
        inner: Box<dyn Cursor>,
        product_type: Arc<RowType>,
    ) -> RowResult<Self> {
        let (left_type, right_type, branch_depth) = match product_type.kind() {
            RowTypeKind::Product {
                left,
                right,
                branch_depth,
                ..
            } => (Arc::clone(left), Arc::clone(right), *branch_depth),
            _ => {
                return Err(RowError::WrongKind(format!(
                    "{} 不是乘积行类型",
                    product_type.name()
                )))
            }
        };
        Ok(Self {
            lifecycle: Lifecycle::new(format!("Product({})", product_type.name())),
            outer,
            inner,
            row_type: product_type,
            left_type,
            right_type,
            branch_key_depth: branch_depth + 1,
            pending: VecDeque::new(),
        })
    }

    fn expand(&mut self, left: RowRef) -> DBResult<()> {
        let Some(hkey) = left.hkey() else {
            return Ok(());
        };
        if hkey.depth() < self.branch_key_depth {
            return Ok(());
        }
        let branch_key = hkey.prefix(self.branch_key_depth);
        self.inner.jump(&branch_key)?;
        while let Some(row) = self.inner.next()? {
            let under_branch = row
                .hkey()
                .map(|k| branch_key.is_prefix_of(k))
                .unwrap_or(false);
            if !under_branch {
                break;
            }
            if row.row_type().is(&self.right_type) {
                let product = ProductRow::new(Arc::clone(&self.row_type), Arc::clone(&left), row)?;
                self.pending.push_back(Arc::new(Row::from(product)));
            }
        }
        trace!(
            "{}: {} 组合出 {} 行",
            self.lifecycle.name(),
            left,
            self.pending.len()
        );
        Ok(())
    }

    fn close_children(&mut self) {
        self.inner.close();
        self.outer.close();
    }
}

impl Cursor for ProductCursor {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    /// 先外后内；内侧打开失败时回滚外侧
    fn open(&mut self) -> DBResult<()> {
        self.lifecycle.check_open()?;
        self.close_children();
        self.pending.clear();
        self.outer.open()?;
        if let Err(e) = self.inner.open() {
            self.outer.close();
            return Err(e);
        }
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
            let Some(row) = self.outer.next()? else {
                self.lifecycle.exhaust();
                return Ok(None);
            };
            if row.row_type().is(&self.left_type) {
                self.expand(row)?;
            } else {
                return Ok(Some(row));
            }
        }
    }

    /// 先内后外
    fn close(&mut self) {
        self.close_children();
        self.pending.clear();
        self.lifecycle.close();
    }
}
