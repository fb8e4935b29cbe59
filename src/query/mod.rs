// Query module for the group database
//
// - optimizer: range algebra, order effectiveness, join order enumeration
// - executor: cursor tree producing hkey-ordered rows
// - query_context: per-query cancellation flag

pub mod executor;
pub mod optimizer;
pub mod query_context;

pub use crate::core::{DBError, DBResult};
pub use query_context::QueryContext;
