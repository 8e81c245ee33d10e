//! Materialized rows and the per-kind result wrappers returned by the facade.

mod dml;
mod result_set;
mod row;
mod select;

pub use dml::{DeleteResult, InsertResult, UpdateResult};
pub use result_set::ResultSet;
pub use row::CustomDbRow;
pub use select::SelectResult;
