use std::sync::Arc;

use super::row::CustomDbRow;
use crate::types::RowValues;

/// A result set from a database query
///
/// Rows are fully materialized when the statement runs, so the row count is known up front.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: Arc::default(),
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = column_names;
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Add a row to the result set
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.results
            .push(CustomDbRow::new(Arc::clone(&self.column_names), row_values));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
