pub mod error;
pub mod expression;
pub mod row;
pub mod schema;
pub mod value;

// 错误和结果类型
pub use error::{
    CursorError, DBError, DBResult, OptimizeError, RangeError, RowError, StorageError,
};

// 核心数据类型
pub use value::*;

pub use expression::{ColumnRef, Comparison, Condition, RowPredicate};
pub use row::{FlattenedRow, ProductRow, Row, RowRef, TableRow, ValuesRow};
pub use schema::{HKey, RowType, RowTypeId, Schema, SchemaBuilder, TableId};
