//! 查询上下文
//!
//! 每个查询一个，游标树的最外层通过它观察取消信号。

use std::sync::atomic::{AtomicBool, Ordering};

/// 查询上下文
///
/// 取消是协作式的：`mark_killed` 只设置标志，由最外层游标在两次 `next()` 之间检查。
pub struct QueryContext {
    /// 查询 ID
    id: u64,

    /// 是否被标记为已终止
    killed: AtomicBool,
}

impl QueryContext {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            killed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 标记为已终止
    pub fn mark_killed(&self) {
        self.killed.store(true, Ordering::SeqCst);
        log::info!("查询 {} 被标记为已终止", self.id);
    }

    /// 检查是否被终止
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// 重置终止标志
    pub fn reset(&self) {
        self.killed.store(false, Ordering::SeqCst);
        log::debug!("查询上下文 {} 已重置", self.id);
    }
}

impl std::fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContext")
            .field("id", &self.id)
            .field("killed", &self.is_killed())
            .finish()
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new(0)
    }
}
