pub mod memory_storage;
pub mod storage_engine;

pub use memory_storage::*;
pub use storage_engine::*;

pub use crate::core::StorageError;
