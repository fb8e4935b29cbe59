//! 执行器模块
//!
//! 执行阶段由游标树完成。游标树只供单个调用方顺序使用，内部不加锁；
//! 需要并行扫描时各自构造独立的游标树。

pub mod cursor;

pub use cursor::{
    collect_rows, CancellableCursor, Cursor, CursorState, FlattenCursor, FlattenJoinType,
    FlattenOptions, GroupScanCursor, IndexScanCursor, ProductCursor, SelectCursor,
    ValuesScanCursor,
};

use std::sync::Arc;

use crate::config::ExecutionConfig;
use crate::query::query_context::QueryContext;

/// 按执行配置包装游标树的根
pub fn wrap_root(
    root: Box<dyn Cursor>,
    ctx: Arc<QueryContext>,
    config: &ExecutionConfig,
) -> Box<dyn Cursor> {
    if config.check_cancellation {
        Box::new(CancellableCursor::new(root, ctx))
    } else {
        root
    }
}
