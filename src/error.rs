use thiserror::Error;

use crate::query::QueryKind;

#[derive(Debug, Error)]
pub enum SqlFacadeError {
    #[error("The passed in query is not a {expected} query")]
    WrongQueryKind { expected: QueryKind },

    #[error("Transaction already active; commit or roll back the previous transaction first")]
    TransactionAlreadyActive,

    #[error("No active transaction; call begin_transaction() first")]
    NoActiveTransaction,

    #[error("Transaction does not match the currently active transaction")]
    TransactionMismatch,

    #[error("A transaction is active; pass it to statements executed within it")]
    MissingTransactionArgument,

    #[error("Transaction passed in without an active transaction")]
    UnexpectedTransactionArgument,

    #[error("Missing value for named parameter :{0}")]
    MissingParameter(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlFacadeError {
    /// `true` for errors raised before any I/O because the call itself was wrong.
    ///
    /// Retrying such a call unchanged fails the same way.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::WrongQueryKind { .. }
                | Self::TransactionAlreadyActive
                | Self::NoActiveTransaction
                | Self::TransactionMismatch
                | Self::MissingTransactionArgument
                | Self::UnexpectedTransactionArgument
                | Self::MissingParameter(_)
                | Self::ParameterError(_)
        )
    }

    /// `true` for failures reported by the connection provider (connect, prepare, execute).
    #[must_use]
    pub fn is_execution(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Self::SqliteError(_) => true,
            Self::ConnectionError(_) | Self::ExecutionError(_) => true,
            _ => false,
        }
    }

    /// `true` for rejected provider options. Raised while building a provider, never by a query.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}
