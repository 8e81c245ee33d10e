//! Transactional query-execution facade over a single database connection.
//!
//! [`SqlFacade`] runs SELECT, INSERT, UPDATE and DELETE statements, each through its own entry
//! point that rejects queries of the wrong kind. Named `:parameters` are either inlined as
//! quoted literals or bound to a prepared statement compiled once per distinct query text.
//! At most one transaction is active at a time, identified by the [`Transaction`] token the
//! caller passes back to every statement inside it.
//!
//! The connection itself comes from a [`ConnectionProvider`]; with the default `sqlite`
//! feature, [`sqlite::SqliteProvider`] supplies one backed by rusqlite.

pub mod binder;
pub mod cache;
pub mod error;
pub mod facade;
pub mod placeholders;
pub mod prelude;
pub mod provider;
pub mod query;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::SqlFacadeError;
pub use facade::SqlFacade;
pub use provider::{ConnectionHandle, ConnectionProvider, ExecutionOutcome};
pub use query::{PreparedQuery, QueryKind};
pub use results::{CustomDbRow, DeleteResult, InsertResult, ResultSet, SelectResult, UpdateResult};
pub use transaction::Transaction;
pub use types::{NamedParams, RowValues};
