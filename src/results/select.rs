use std::collections::HashMap;
use std::sync::Arc;
use std::vec;

use super::result_set::ResultSet;
use super::row::CustomDbRow;
use crate::types::RowValues;

/// Rows produced by a SELECT, read through a single forward cursor.
///
/// [`fetch_numeric`](Self::fetch_numeric) and [`fetch_assoc`](Self::fetch_assoc) advance the
/// same cursor, so mixing them interleaves rows rather than reading the set twice.
#[derive(Debug)]
pub struct SelectResult {
    column_names: Arc<Vec<String>>,
    row_count: usize,
    cursor: vec::IntoIter<CustomDbRow>,
}

impl SelectResult {
    #[must_use]
    pub fn new(rows: ResultSet) -> Self {
        let column_names = Arc::clone(rows.get_column_names());
        let row_count = rows.len();
        Self {
            column_names,
            row_count,
            cursor: rows.results.into_iter(),
        }
    }

    /// Next row as values by column position, or `None` once exhausted.
    pub fn fetch_numeric(&mut self) -> Option<Vec<RowValues>> {
        self.cursor.next().map(CustomDbRow::into_values)
    }

    /// Next row as a column name to value mapping, or `None` once exhausted.
    pub fn fetch_assoc(&mut self) -> Option<HashMap<String, RowValues>> {
        self.cursor.next().map(CustomDbRow::into_assoc)
    }

    /// Next row with both positional and by-name access, or `None` once exhausted.
    pub fn fetch_row(&mut self) -> Option<CustomDbRow> {
        self.cursor.next()
    }

    /// Number of rows the statement produced. Unaffected by fetching.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }
}
