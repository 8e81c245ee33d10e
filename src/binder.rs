//! Named-parameter binding, either inlined as quoted literals or handed to a prepared statement.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::SqlFacadeError;
use crate::placeholders::scan_placeholders;
use crate::types::{NamedParams, RowValues};

/// Bind values for a prepared statement, keyed by `:name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindMap {
    entries: BTreeMap<String, RowValues>,
}

impl BindMap {
    /// Look up a value by its bind key (including the leading `:`).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RowValues> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RowValues> {
        self.entries.iter()
    }
}

/// Check that every placeholder in `sql` has a value in `params`.
///
/// # Errors
///
/// Returns `SqlFacadeError::MissingParameter` naming the first unbound placeholder.
pub fn ensure_bound(sql: &str, params: &NamedParams) -> Result<(), SqlFacadeError> {
    match scan_placeholders(sql)
        .into_iter()
        .find(|p| params.get(p.name).is_none())
    {
        Some(missing) => Err(SqlFacadeError::MissingParameter(missing.name.to_owned())),
        None => Ok(()),
    }
}

/// Check that every value referenced by `sql` can be written as an inline literal.
///
/// # Errors
///
/// Returns `SqlFacadeError::ParameterError` for a referenced blob. Missing names are left to
/// [`ensure_bound`].
pub fn ensure_inline_literals(sql: &str, params: &NamedParams) -> Result<(), SqlFacadeError> {
    for placeholder in scan_placeholders(sql) {
        if let Some(value) = params.get(placeholder.name) {
            value.to_literal_text()?;
        }
    }
    Ok(())
}

/// Substitute each `:name` in `sql` with its value rendered as a SQL literal.
///
/// `Null` becomes the `null` keyword; every other value is turned into text and passed through
/// `quote`, the driver's literal quoting rule. Substitution happens in a single pass over the
/// original text, so quoted values are never scanned again.
///
/// # Errors
///
/// Returns `SqlFacadeError::MissingParameter` for a placeholder without a value and
/// `SqlFacadeError::ParameterError` for values with no literal form.
pub fn bind_inline<F>(sql: &str, params: &NamedParams, quote: F) -> Result<String, SqlFacadeError>
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for placeholder in scan_placeholders(sql) {
        let value = params
            .get(placeholder.name)
            .ok_or_else(|| SqlFacadeError::MissingParameter(placeholder.name.to_owned()))?;
        out.push_str(&sql[last..placeholder.span.start]);
        match value.to_literal_text()? {
            Some(text) => out.push_str(&quote(&text)),
            None => out.push_str("null"),
        }
        last = placeholder.span.end;
    }
    out.push_str(&sql[last..]);
    Ok(out)
}

/// Build the bind map for a prepared statement. Values pass through unmodified.
#[must_use]
pub fn bind_prepared(params: &NamedParams) -> BindMap {
    BindMap {
        entries: params
            .iter()
            .map(|(name, value)| (format!(":{name}"), value.clone()))
            .collect(),
    }
}
