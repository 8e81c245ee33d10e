//! Convenient imports for common functionality.

pub use crate::error::SqlFacadeError;
pub use crate::facade::SqlFacade;
pub use crate::named_params;
pub use crate::provider::{ConnectionHandle, ConnectionProvider};
pub use crate::query::{PreparedQuery, QueryKind};
pub use crate::results::{DeleteResult, InsertResult, SelectResult, UpdateResult};
pub use crate::transaction::Transaction;
pub use crate::types::{NamedParams, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteProvider};
