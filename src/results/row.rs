use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    pub values: Vec<RowValues>,
}

impl CustomDbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    ///
    /// Returns `None` if the column wasn't found.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Consume the row into its values by position.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    /// Consume the row into a column name to value mapping.
    ///
    /// With duplicate column names the rightmost value wins.
    #[must_use]
    pub fn into_assoc(self) -> HashMap<String, RowValues> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }
}
