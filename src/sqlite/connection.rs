use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::hooks::Action;
use rusqlite::{Connection, Statement};
use tracing::debug;

use crate::binder::BindMap;
use crate::error::SqlFacadeError;
use crate::provider::{ConnectionHandle, ConnectionProvider, ExecutionOutcome};

use super::config::SqliteOptions;
use super::params::{quote_literal, row_value_to_sqlite_value};
use super::query::build_result_set;

/// Connection provider backed by rusqlite.
#[derive(Debug, Clone)]
pub struct SqliteProvider {
    options: SqliteOptions,
}

impl SqliteProvider {
    /// # Errors
    ///
    /// Returns `SqlFacadeError::ConfigError` if the options are invalid.
    pub fn new(options: SqliteOptions) -> Result<Self, SqlFacadeError> {
        options.validate()?;
        Ok(Self { options })
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }
}

impl ConnectionProvider for SqliteProvider {
    type Handle = SqliteHandle;

    fn connect(&self) -> Result<SqliteHandle, SqlFacadeError> {
        let opts = &self.options;
        let conn = Connection::open(&opts.db_path).map_err(|e| {
            SqlFacadeError::ConnectionError(format!(
                "failed to open SQLite database {}: {e}",
                opts.db_path
            ))
        })?;
        conn.set_prepared_statement_cache_capacity(opts.statement_cache_capacity);
        if let Some(millis) = opts.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(millis))?;
        }
        if opts.journal_wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        if let Some(init) = &opts.init_batch {
            conn.execute_batch(init)?;
        }
        let inserted = Arc::new(Mutex::new(InsertedRows::default()));
        let sink = Arc::clone(&inserted);
        conn.update_hook(Some(
            move |action: Action, _db: &str, table: &str, rowid: i64| {
                if action == Action::SQLITE_INSERT {
                    lock_rows(&sink).record(table, rowid);
                }
            },
        ))?;
        debug!(db_path = %opts.db_path, "opened SQLite connection");
        Ok(SqliteHandle {
            conn,
            inserted,
            cache_capacity: opts.statement_cache_capacity,
            compiled: 0,
        })
    }
}

/// Compiled `SQLite` statement.
///
/// rusqlite statements borrow their connection, so the handle keeps the query text and
/// re-fetches the compiled form from the connection's statement cache on each execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStatement {
    sql: Arc<str>,
}

impl SqliteStatement {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Rowids inserted by the current statement, as reported by the update hook.
#[derive(Debug, Default)]
struct InsertedRows {
    // (table, first rowid, latest rowid) in order of first insert
    tables: Vec<(String, i64, i64)>,
}

impl InsertedRows {
    fn record(&mut self, table: &str, rowid: i64) {
        match self.tables.iter_mut().find(|(name, _, _)| name == table) {
            Some(entry) => entry.2 = rowid,
            None => self.tables.push((table.to_owned(), rowid, rowid)),
        }
    }

    fn clear(&mut self) {
        self.tables.clear();
    }

    /// First rowid inserted into the table whose latest insert was `last`.
    fn first_for(&self, last: i64) -> Option<i64> {
        self.tables
            .iter()
            .find(|(_, _, latest)| *latest == last)
            .map(|(_, first, _)| *first)
    }
}

fn lock_rows(rows: &Mutex<InsertedRows>) -> MutexGuard<'_, InsertedRows> {
    match rows.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A live rusqlite connection.
pub struct SqliteHandle {
    conn: Connection,
    inserted: Arc<Mutex<InsertedRows>>,
    // rusqlite's statement cache is an LRU; it is kept at least as large as the number of
    // statements compiled through `prepare` so none of them is silently recompiled.
    cache_capacity: usize,
    compiled: usize,
}

impl SqliteHandle {
    /// Current capacity of rusqlite's statement cache on this connection.
    #[must_use]
    pub fn statement_cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), SqlFacadeError> {
        self.conn
            .execute_batch(sql)
            .map_err(SqlFacadeError::SqliteError)
    }
}

fn run_statement(stmt: &mut Statement<'_>) -> Result<ExecutionOutcome, SqlFacadeError> {
    if stmt.column_count() > 0 {
        Ok(ExecutionOutcome::with_rows(build_result_set(stmt)?))
    } else {
        let affected = stmt.raw_execute()?;
        Ok(ExecutionOutcome::affected(affected as u64))
    }
}

impl ConnectionHandle for SqliteHandle {
    type Compiled = SqliteStatement;

    fn begin_transaction(&mut self) -> Result<(), SqlFacadeError> {
        self.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), SqlFacadeError> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), SqlFacadeError> {
        self.execute_batch("ROLLBACK")
    }

    fn execute_raw(&mut self, sql: &str) -> Result<ExecutionOutcome, SqlFacadeError> {
        lock_rows(&self.inserted).clear();
        let mut stmt = self.conn.prepare(sql)?;
        run_statement(&mut stmt)
    }

    fn prepare(&mut self, sql: &str) -> Result<SqliteStatement, SqlFacadeError> {
        let needed = self.compiled + 1;
        if needed > self.cache_capacity {
            self.conn.set_prepared_statement_cache_capacity(needed);
            self.cache_capacity = needed;
            debug!(capacity = needed, "grew SQLite statement cache");
        }
        // Compile now so syntax errors surface at prepare time; the cached form is reused.
        drop(self.conn.prepare_cached(sql)?);
        self.compiled = needed;
        Ok(SqliteStatement {
            sql: Arc::from(sql),
        })
    }

    fn execute_compiled(
        &mut self,
        statement: &SqliteStatement,
        binds: &BindMap,
    ) -> Result<ExecutionOutcome, SqlFacadeError> {
        lock_rows(&self.inserted).clear();
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        for (name, value) in binds.iter() {
            if let Some(idx) = stmt.parameter_index(name)? {
                stmt.raw_bind_parameter(idx, row_value_to_sqlite_value(value))?;
            }
        }
        run_statement(&mut stmt)
    }

    fn quote_literal(&self, value: &str) -> String {
        quote_literal(value)
    }

    /// The rowid of the first row the last statement inserted into its target table.
    ///
    /// `last_insert_rowid` names the final row of the statement; the update hook records the
    /// first rowid seen for the same table, whatever order the ids came in. Tables without
    /// rowids, and statements that inserted nothing, report `last_insert_rowid` unchanged.
    fn last_insert_id(&self) -> Result<i64, SqlFacadeError> {
        let last = self.conn.last_insert_rowid();
        Ok(lock_rows(&self.inserted).first_for(last).unwrap_or(last))
    }
}

impl fmt::Debug for SqliteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteHandle")
            .field("conn", &self.conn)
            .field("cache_capacity", &self.cache_capacity)
            .field("compiled", &self.compiled)
            .finish()
    }
}
