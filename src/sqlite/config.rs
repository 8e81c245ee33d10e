use serde::Deserialize;

use crate::error::SqlFacadeError;

use super::connection::SqliteProvider;

const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 64;

/// Options for opening a `SQLite` connection.
///
/// Deserializable from any serde format; every field but `db_path` has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteOptions {
    /// Database file path, or `:memory:`.
    pub db_path: String,
    /// Busy timeout applied to the connection, in milliseconds.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    /// Switch the database to `PRAGMA journal_mode = WAL` on connect.
    #[serde(default)]
    pub journal_wal: bool,
    /// Initial capacity of rusqlite's per-connection statement cache. A connection grows it
    /// past this value when more distinct prepared queries have been compiled than fit.
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
    /// SQL batch run once right after connecting (schema setup, pragmas).
    #[serde(default)]
    pub init_batch: Option<String>,
}

fn default_statement_cache_capacity() -> usize {
    DEFAULT_STATEMENT_CACHE_CAPACITY
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout_ms: None,
            journal_wal: false,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            init_batch: None,
        }
    }

    /// In-memory database private to the connection.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Parse options from JSON.
    ///
    /// # Errors
    ///
    /// Returns `SqlFacadeError::ConfigError` if the JSON does not describe valid options.
    pub fn from_json(json: &str) -> Result<Self, SqlFacadeError> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| SqlFacadeError::ConfigError(format!("invalid SQLite options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// # Errors
    ///
    /// Returns `SqlFacadeError::ConfigError` for an empty path or a zero cache capacity.
    pub fn validate(&self) -> Result<(), SqlFacadeError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlFacadeError::ConfigError(
                "SQLite db_path must not be empty".into(),
            ));
        }
        if self.statement_cache_capacity == 0 {
            return Err(SqlFacadeError::ConfigError(
                "statement_cache_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, millis: u64) -> Self {
        self.opts.busy_timeout_ms = Some(millis);
        self
    }

    #[must_use]
    pub fn journal_wal(mut self, enabled: bool) -> Self {
        self.opts.journal_wal = enabled;
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn init_batch(mut self, sql: impl Into<String>) -> Self {
        self.opts.init_batch = Some(sql.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Validate the options and wrap them in a provider.
    ///
    /// # Errors
    ///
    /// Returns `SqlFacadeError::ConfigError` if the options are invalid.
    pub fn build(self) -> Result<SqliteProvider, SqlFacadeError> {
        SqliteProvider::new(self.finish())
    }
}
