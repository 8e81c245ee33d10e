//! Test helpers: a provider wrapper that records the calls the facade makes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::binder::BindMap;
use crate::error::SqlFacadeError;
use crate::provider::{ConnectionHandle, ConnectionProvider, ExecutionOutcome};
use crate::sqlite::{SqliteOptions, SqliteProvider};

/// Counters shared between a [`RecordingProvider`] and the handles it opens.
#[derive(Debug, Default)]
pub struct CallLog {
    connects: AtomicUsize,
    prepares: AtomicUsize,
    compiled_executions: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    raw_sql: Mutex<Vec<String>>,
}

impl CallLog {
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn compiled_executions(&self) -> usize {
        self.compiled_executions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Fully bound query texts passed to `execute_raw`, in order.
    #[must_use]
    pub fn raw_sql(&self) -> Vec<String> {
        self.raw_sql_guard().clone()
    }

    /// Total statements that reached the connection, raw or compiled.
    #[must_use]
    pub fn executions(&self) -> usize {
        self.raw_sql_guard().len() + self.compiled_executions()
    }

    fn raw_sql_guard(&self) -> MutexGuard<'_, Vec<String>> {
        match self.raw_sql.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wraps a provider and records every call made through it.
#[derive(Debug)]
pub struct RecordingProvider<P> {
    inner: P,
    log: Arc<CallLog>,
}

impl<P: ConnectionProvider> RecordingProvider<P> {
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            log: Arc::new(CallLog::default()),
        }
    }

    /// Shared view of the recorded calls; stays valid after the provider moves into a facade.
    #[must_use]
    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

impl<P: ConnectionProvider> ConnectionProvider for RecordingProvider<P> {
    type Handle = RecordingHandle<P::Handle>;

    fn connect(&self) -> Result<Self::Handle, SqlFacadeError> {
        CallLog::bump(&self.log.connects);
        Ok(RecordingHandle {
            inner: self.inner.connect()?,
            log: Arc::clone(&self.log),
        })
    }
}

/// Handle opened by a [`RecordingProvider`].
#[derive(Debug)]
pub struct RecordingHandle<H> {
    inner: H,
    log: Arc<CallLog>,
}

impl<H: ConnectionHandle> ConnectionHandle for RecordingHandle<H> {
    type Compiled = H::Compiled;

    fn begin_transaction(&mut self) -> Result<(), SqlFacadeError> {
        CallLog::bump(&self.log.begins);
        self.inner.begin_transaction()
    }

    fn commit(&mut self) -> Result<(), SqlFacadeError> {
        CallLog::bump(&self.log.commits);
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), SqlFacadeError> {
        CallLog::bump(&self.log.rollbacks);
        self.inner.rollback()
    }

    fn execute_raw(&mut self, sql: &str) -> Result<ExecutionOutcome, SqlFacadeError> {
        self.log.raw_sql_guard().push(sql.to_owned());
        self.inner.execute_raw(sql)
    }

    fn prepare(&mut self, sql: &str) -> Result<Self::Compiled, SqlFacadeError> {
        CallLog::bump(&self.log.prepares);
        self.inner.prepare(sql)
    }

    fn execute_compiled(
        &mut self,
        statement: &Self::Compiled,
        binds: &BindMap,
    ) -> Result<ExecutionOutcome, SqlFacadeError> {
        CallLog::bump(&self.log.compiled_executions);
        self.inner.execute_compiled(statement, binds)
    }

    fn quote_literal(&self, value: &str) -> String {
        self.inner.quote_literal(value)
    }

    fn last_insert_id(&self) -> Result<i64, SqlFacadeError> {
        self.inner.last_insert_id()
    }
}

/// Schema used by the integration tests.
pub const TEST_TABLE_DDL: &str = "CREATE TABLE testtable (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    foo VARCHAR(80) NULL
);";

/// In-memory `SQLite` provider with `schema` applied on connect.
///
/// # Errors
///
/// Returns `SqlFacadeError::ConfigError` if the options are rejected.
pub fn sqlite_memory(schema: &str) -> Result<SqliteProvider, SqlFacadeError> {
    SqliteOptions::builder(":memory:").init_batch(schema).build()
}

/// Recording wrapper around [`sqlite_memory`].
///
/// # Errors
///
/// Returns `SqlFacadeError::ConfigError` if the options are rejected.
pub fn recording_sqlite_memory(
    schema: &str,
) -> Result<RecordingProvider<SqliteProvider>, SqlFacadeError> {
    Ok(RecordingProvider::new(sqlite_memory(schema)?))
}
