use tracing::{debug, warn};

use crate::binder::{bind_inline, bind_prepared, ensure_bound, ensure_inline_literals};
use crate::cache::StatementCache;
use crate::error::SqlFacadeError;
use crate::provider::{ConnectionHandle, ConnectionProvider, ExecutionOutcome};
use crate::query::{PreparedQuery, QueryKind};
use crate::results::{DeleteResult, InsertResult, SelectResult, UpdateResult};
use crate::transaction::{Transaction, TransactionGuard};
use crate::types::NamedParams;

type CompiledOf<P> = <<P as ConnectionProvider>::Handle as ConnectionHandle>::Compiled;

/// Transactional query-execution facade over one lazily opened connection.
///
/// Each entry point checks that the query's leading keyword matches the operation, that the
/// transaction argument agrees with the current transaction state, and that every `:name`
/// placeholder has a value, all before touching the connection. Calls are synchronous and the
/// facade is meant for one caller at a time; use one facade per thread.
///
/// ```rust
/// use sql_facade::prelude::*;
///
/// # fn main() -> Result<(), SqlFacadeError> {
/// let provider = SqliteOptions::builder(":memory:")
///     .init_batch("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, foo TEXT)")
///     .build()?;
/// let mut sql = SqlFacade::new(provider);
///
/// let inserted = sql.insert(
///     "INSERT INTO t (foo) VALUES (:foo)",
///     &named_params! { "foo" => "bar" },
///     None,
/// )?;
/// assert_eq!(inserted.last_insert_id(), 1);
///
/// let tx = sql.begin_transaction()?;
/// sql.delete("DELETE FROM t WHERE id = :id", &named_params! { "id" => 1 }, Some(&tx))?;
/// sql.rollback(&tx)?;
///
/// let mut rows = sql.select("SELECT foo FROM t", &NamedParams::new(), None)?;
/// assert_eq!(rows.row_count(), 1);
/// assert_eq!(rows.fetch_numeric(), Some(vec![RowValues::Text("bar".into())]));
/// # Ok(())
/// # }
/// ```
pub struct SqlFacade<P: ConnectionProvider> {
    provider: P,
    handle: Option<P::Handle>,
    statements: StatementCache<CompiledOf<P>>,
    guard: TransactionGuard,
}

enum Source<'q> {
    Inline(&'q str),
    Prepared(&'q PreparedQuery),
}

impl Source<'_> {
    fn sql(&self) -> &str {
        match self {
            Source::Inline(sql) => sql,
            Source::Prepared(query) => query.sql(),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Source::Inline(_) => "inline",
            Source::Prepared(_) => "prepared",
        }
    }
}

struct Executed {
    outcome: ExecutionOutcome,
    last_insert_id: Option<i64>,
}

impl<P: ConnectionProvider> SqlFacade<P> {
    /// Wrap a provider. No connection is opened until the first statement or transaction.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            handle: None,
            statements: StatementCache::new(),
            guard: TransactionGuard::new(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.guard.is_active()
    }

    /// Number of distinct prepared query texts compiled so far.
    #[must_use]
    pub fn cached_statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Start a transaction and return its token.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyActive` while another transaction is outstanding, or the
    /// provider's error if connecting or BEGIN fails.
    pub fn begin_transaction(&mut self) -> Result<Transaction, SqlFacadeError> {
        let provider = &self.provider;
        let slot = &mut self.handle;
        self.guard
            .begin(|| acquire(provider, slot)?.begin_transaction())
    }

    /// Commit the active transaction.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` or `TransactionMismatch` for a wrong token, or the
    /// provider's error if COMMIT fails (the transaction then stays active).
    pub fn commit(&mut self, tx: &Transaction) -> Result<(), SqlFacadeError> {
        let provider = &self.provider;
        let slot = &mut self.handle;
        self.guard.commit(tx, || acquire(provider, slot)?.commit())
    }

    /// Roll back the active transaction.
    ///
    /// # Errors
    ///
    /// Same as [`SqlFacade::commit`].
    pub fn rollback(&mut self, tx: &Transaction) -> Result<(), SqlFacadeError> {
        let provider = &self.provider;
        let slot = &mut self.handle;
        self.guard.rollback(tx, || acquire(provider, slot)?.rollback())
    }

    /// Run a SELECT given as query text.
    ///
    /// # Errors
    ///
    /// Validation errors (`WrongQueryKind`, transaction argument errors, `MissingParameter`,
    /// `ParameterError`) are raised before any I/O; provider errors are passed through.
    pub fn select(
        &mut self,
        query: &str,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<SelectResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Select, Source::Inline(query), params, tx)?;
        into_select(executed)
    }

    /// Run an INSERT given as query text.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select`].
    pub fn insert(
        &mut self,
        query: &str,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<InsertResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Insert, Source::Inline(query), params, tx)?;
        Ok(into_insert(executed))
    }

    /// Run an UPDATE given as query text.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select`].
    pub fn update(
        &mut self,
        query: &str,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<UpdateResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Update, Source::Inline(query), params, tx)?;
        Ok(UpdateResult::new(executed.outcome.affected_rows))
    }

    /// Run a DELETE given as query text.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select`].
    pub fn delete(
        &mut self,
        query: &str,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<DeleteResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Delete, Source::Inline(query), params, tx)?;
        Ok(DeleteResult::new(executed.outcome.affected_rows))
    }

    /// Run a SELECT through the prepared statement cache.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select`]. Compile failures from the provider are passed through.
    pub fn select_prepared(
        &mut self,
        query: &PreparedQuery,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<SelectResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Select, Source::Prepared(query), params, tx)?;
        into_select(executed)
    }

    /// Run an INSERT through the prepared statement cache.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select_prepared`].
    pub fn insert_prepared(
        &mut self,
        query: &PreparedQuery,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<InsertResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Insert, Source::Prepared(query), params, tx)?;
        Ok(into_insert(executed))
    }

    /// Run an UPDATE through the prepared statement cache.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select_prepared`].
    pub fn update_prepared(
        &mut self,
        query: &PreparedQuery,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<UpdateResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Update, Source::Prepared(query), params, tx)?;
        Ok(UpdateResult::new(executed.outcome.affected_rows))
    }

    /// Run a DELETE through the prepared statement cache.
    ///
    /// # Errors
    ///
    /// See [`SqlFacade::select_prepared`].
    pub fn delete_prepared(
        &mut self,
        query: &PreparedQuery,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<DeleteResult, SqlFacadeError> {
        let executed = self.execute(QueryKind::Delete, Source::Prepared(query), params, tx)?;
        Ok(DeleteResult::new(executed.outcome.affected_rows))
    }

    fn execute(
        &mut self,
        kind: QueryKind,
        source: Source<'_>,
        params: &NamedParams,
        tx: Option<&Transaction>,
    ) -> Result<Executed, SqlFacadeError> {
        let sql = source.sql();
        kind.ensure_matches(sql)?;
        self.guard.validate(tx)?;
        ensure_bound(sql, params)?;
        if matches!(source, Source::Inline(_)) {
            ensure_inline_literals(sql, params)?;
        }

        let handle = acquire(&self.provider, &mut self.handle)?;
        debug!(kind = %kind, mode = source.mode(), in_transaction = tx.is_some(), "executing statement");

        let outcome = match source {
            Source::Inline(sql) => {
                let bound = bind_inline(sql, params, |value| handle.quote_literal(value))?;
                handle.execute_raw(&bound)?
            }
            Source::Prepared(query) => {
                let compiled = self
                    .statements
                    .get_or_compile(query.sql(), |text| handle.prepare(text))?;
                let binds = bind_prepared(params);
                handle.execute_compiled(compiled, &binds)?
            }
        };

        let last_insert_id = if kind == QueryKind::Insert {
            Some(handle.last_insert_id()?)
        } else {
            None
        };
        Ok(Executed {
            outcome,
            last_insert_id,
        })
    }
}

fn acquire<'a, P: ConnectionProvider>(
    provider: &P,
    slot: &'a mut Option<P::Handle>,
) -> Result<&'a mut P::Handle, SqlFacadeError> {
    if slot.is_none() {
        debug!("opening connection");
        *slot = Some(provider.connect()?);
    }
    slot.as_mut()
        .ok_or_else(|| SqlFacadeError::ConnectionError("connection handle unavailable".into()))
}

fn into_select(executed: Executed) -> Result<SelectResult, SqlFacadeError> {
    executed
        .outcome
        .rows
        .map(SelectResult::new)
        .ok_or_else(|| SqlFacadeError::ExecutionError("SELECT produced no result set".into()))
}

fn into_insert(executed: Executed) -> InsertResult {
    InsertResult::new(
        executed.outcome.affected_rows,
        executed.last_insert_id.unwrap_or_default(),
    )
}

impl<P: ConnectionProvider> Drop for SqlFacade<P> {
    fn drop(&mut self) {
        if !self.guard.is_active() {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            warn!("facade dropped with an active transaction; rolling back");
            if let Err(err) = handle.rollback() {
                warn!(error = %err, "rollback on drop failed");
            }
        }
    }
}

impl<P> std::fmt::Debug for SqlFacade<P>
where
    P: ConnectionProvider + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlFacade")
            .field("provider", &self.provider)
            .field("connected", &self.handle.is_some())
            .field("cached_statements", &self.statements.len())
            .field("guard", &self.guard)
            .finish()
    }
}
