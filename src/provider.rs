//! The capability the facade consumes from a database driver.
//!
//! A [`ConnectionProvider`] opens one live [`ConnectionHandle`]; the facade opens it lazily on
//! first use and holds it for its own lifetime. Handles own the low-level primitives: raw and
//! compiled execution, literal quoting, transaction control and last-insert-id reporting.

use crate::binder::BindMap;
use crate::error::SqlFacadeError;
use crate::results::ResultSet;

/// Raw facts reported by a handle after executing one statement.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Rows changed by the statement, or rows produced when it returned a result set.
    pub affected_rows: u64,
    /// Materialized rows, present when the statement produced a result set.
    pub rows: Option<ResultSet>,
}

impl ExecutionOutcome {
    #[must_use]
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            rows: None,
        }
    }

    #[must_use]
    pub fn with_rows(rows: ResultSet) -> Self {
        Self {
            affected_rows: rows.len() as u64,
            rows: Some(rows),
        }
    }
}

/// Opens connections. Construction parameters belong to the implementor.
pub trait ConnectionProvider {
    type Handle: ConnectionHandle;

    /// Open a new live connection.
    ///
    /// # Errors
    ///
    /// Returns the driver's connection failure.
    fn connect(&self) -> Result<Self::Handle, SqlFacadeError>;
}

/// A live connection.
///
/// Every error is passed to the caller of the facade unchanged.
pub trait ConnectionHandle {
    /// Driver representation of a compiled statement.
    type Compiled;

    fn begin_transaction(&mut self) -> Result<(), SqlFacadeError>;

    fn commit(&mut self) -> Result<(), SqlFacadeError>;

    fn rollback(&mut self) -> Result<(), SqlFacadeError>;

    /// Execute fully bound query text.
    fn execute_raw(&mut self, sql: &str) -> Result<ExecutionOutcome, SqlFacadeError>;

    /// Compile query text with named placeholders for repeated execution.
    fn prepare(&mut self, sql: &str) -> Result<Self::Compiled, SqlFacadeError>;

    /// Execute a compiled statement, binding each `:name` entry of `binds` it declares.
    fn execute_compiled(
        &mut self,
        statement: &Self::Compiled,
        binds: &BindMap,
    ) -> Result<ExecutionOutcome, SqlFacadeError>;

    /// Quote a string as a SQL literal under the driver's rules.
    fn quote_literal(&self, value: &str) -> String;

    /// Id of the first row inserted by the most recent INSERT.
    fn last_insert_id(&self) -> Result<i64, SqlFacadeError>;
}
