use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::SqlFacadeError;

/// Compiled statements keyed by exact query text.
///
/// Each distinct text is compiled at most once; entries live as long as the cache. There is no
/// eviction.
#[derive(Debug)]
pub struct StatementCache<C> {
    statements: HashMap<Arc<str>, C>,
}

impl<C> Default for StatementCache<C> {
    fn default() -> Self {
        Self {
            statements: HashMap::new(),
        }
    }
}

impl<C> StatementCache<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled statement for `sql`, compiling it with `compile` on first use.
    ///
    /// A failed compile caches nothing.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `compile`.
    pub fn get_or_compile<F>(&mut self, sql: &str, compile: F) -> Result<&C, SqlFacadeError>
    where
        F: FnOnce(&str) -> Result<C, SqlFacadeError>,
    {
        if !self.statements.contains_key(sql) {
            debug!(sql, "compiling prepared statement");
            let compiled = compile(sql)?;
            self.statements.insert(Arc::from(sql), compiled);
        }
        self.statements.get(sql).ok_or_else(|| {
            SqlFacadeError::ExecutionError(format!("prepared statement cache lost entry for {sql}"))
        })
    }

    #[must_use]
    pub fn contains(&self, sql: &str) -> bool {
        self.statements.contains_key(sql)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_each_text_once() {
        let mut cache = StatementCache::new();
        let mut compiles = 0;

        for _ in 0..3 {
            let compiled = cache
                .get_or_compile("SELECT 1", |sql| {
                    compiles += 1;
                    Ok(sql.len())
                })
                .unwrap();
            assert_eq!(*compiled, 8);
        }
        assert_eq!(compiles, 1);

        cache
            .get_or_compile("SELECT 2", |_| {
                compiles += 1;
                Ok(0)
            })
            .unwrap();
        assert_eq!(compiles, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_compile_is_not_cached() {
        let mut cache: StatementCache<()> = StatementCache::new();
        let err = cache
            .get_or_compile("SELEC oops", |_| {
                Err(SqlFacadeError::ExecutionError("syntax error".into()))
            })
            .unwrap_err();
        assert!(matches!(err, SqlFacadeError::ExecutionError(_)));
        assert!(!cache.contains("SELEC oops"));
        assert!(cache.is_empty());
    }
}
