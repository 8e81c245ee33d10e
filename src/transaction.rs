use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::SqlFacadeError;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Token for the currently active transaction.
///
/// Returned by `SqlFacade::begin_transaction` and passed back to every statement executed
/// inside the transaction, and to `commit` or `rollback`. Ids are unique per process, so a
/// token from another facade or an earlier transaction never matches.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Transaction {
    id: u64,
}

impl Transaction {
    fn fresh() -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TxState {
    #[default]
    Idle,
    Active(u64),
}

/// State machine enforcing at most one active transaction.
#[derive(Debug, Default)]
pub struct TransactionGuard {
    state: TxState,
}

impl TransactionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, TxState::Active(_))
    }

    /// Start a transaction; `start` issues the BEGIN on the connection.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAlreadyActive` while another transaction is outstanding, or the
    /// error from `start`, in which case the guard stays idle.
    pub fn begin<F>(&mut self, start: F) -> Result<Transaction, SqlFacadeError>
    where
        F: FnOnce() -> Result<(), SqlFacadeError>,
    {
        if self.is_active() {
            return Err(SqlFacadeError::TransactionAlreadyActive);
        }
        start()?;
        let tx = Transaction::fresh();
        self.state = TxState::Active(tx.id);
        debug!(transaction = tx.id, "transaction started");
        Ok(tx)
    }

    /// Commit the active transaction; `finish` issues the COMMIT.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` or `TransactionMismatch` before calling `finish`. If
    /// `finish` fails the transaction stays active so the caller can roll it back.
    pub fn commit<F>(&mut self, tx: &Transaction, finish: F) -> Result<(), SqlFacadeError>
    where
        F: FnOnce() -> Result<(), SqlFacadeError>,
    {
        self.end(tx, "committed", finish)
    }

    /// Roll back the active transaction; `finish` issues the ROLLBACK.
    ///
    /// # Errors
    ///
    /// Same as [`TransactionGuard::commit`].
    pub fn rollback<F>(&mut self, tx: &Transaction, finish: F) -> Result<(), SqlFacadeError>
    where
        F: FnOnce() -> Result<(), SqlFacadeError>,
    {
        self.end(tx, "rolled back", finish)
    }

    fn end<F>(&mut self, tx: &Transaction, outcome: &str, finish: F) -> Result<(), SqlFacadeError>
    where
        F: FnOnce() -> Result<(), SqlFacadeError>,
    {
        match self.state {
            TxState::Idle => Err(SqlFacadeError::NoActiveTransaction),
            TxState::Active(id) if id != tx.id => Err(SqlFacadeError::TransactionMismatch),
            TxState::Active(id) => {
                finish()?;
                self.state = TxState::Idle;
                debug!(transaction = id, "transaction {outcome}");
                Ok(())
            }
        }
    }

    /// Check the transaction argument of a statement against the current state.
    ///
    /// # Errors
    ///
    /// While a transaction is active the matching token is required
    /// (`MissingTransactionArgument`, `TransactionMismatch`); while idle none may be passed
    /// (`UnexpectedTransactionArgument`).
    pub fn validate(&self, tx: Option<&Transaction>) -> Result<(), SqlFacadeError> {
        match (self.state, tx) {
            (TxState::Idle, None) => Ok(()),
            (TxState::Idle, Some(_)) => Err(SqlFacadeError::UnexpectedTransactionArgument),
            (TxState::Active(_), None) => Err(SqlFacadeError::MissingTransactionArgument),
            (TxState::Active(id), Some(tx)) if id == tx.id => Ok(()),
            (TxState::Active(_), Some(_)) => Err(SqlFacadeError::TransactionMismatch),
        }
    }
}
