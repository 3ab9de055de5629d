use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// Name-to-position lookup shared by every row of one table.
#[derive(Debug, Default)]
pub(crate) struct ColumnIndex {
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl ColumnIndex {
    pub(crate) fn new(column_names: &[String]) -> Self {
        let mut exact = HashMap::with_capacity(column_names.len());
        let mut folded = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            exact.entry(name.clone()).or_insert(i);
            folded.entry(name.to_lowercase()).or_insert(i);
        }
        Self { exact, folded }
    }

    pub(crate) fn exact(&self, name: &str) -> Option<usize> {
        self.exact.get(name).copied()
    }

    pub(crate) fn folded(&self, name: &str) -> Option<usize> {
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.to_lowercase()))
            .copied()
    }
}

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    // Shared lookup so rows never compare strings linearly
    #[doc(hidden)]
    pub(crate) column_index: Arc<ColumnIndex>,
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `rows` - The values for this row
    ///
    /// # Returns
    ///
    /// A new `CustomDbRow` instance
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let column_index = Arc::new(ColumnIndex::new(&column_names));
        Self {
            column_names,
            rows,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        rows: Vec<RowValues>,
        column_index: Arc<ColumnIndex>,
    ) -> Self {
        Self {
            column_names,
            rows,
            column_index,
        }
    }

    /// Get the index of a column by its exact name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.exact(column_name)
    }

    /// Get the index of a column, ignoring ASCII and Unicode case.
    ///
    /// An exact match wins over a case-folded one; among case-folded matches the
    /// leftmost column wins.
    #[must_use]
    pub fn find_column(&self, column_name: &str) -> Option<usize> {
        self.column_index.folded(column_name)
    }

    /// Get a value from the row by exact column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column name, ignoring case
    #[must_use]
    pub fn get_ignore_case(&self, column_name: &str) -> Option<&RowValues> {
        self.find_column(column_name).and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the column
    ///
    /// # Returns
    ///
    /// The value at the index, or None if the index is out of bounds
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Iterate `(column name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> CustomDbRow {
        CustomDbRow::new(
            Arc::new(vec!["Id".into(), "user_name".into(), "ID".into()]),
            vec![
                RowValues::Int(1),
                RowValues::Text("erick".into()),
                RowValues::Int(2),
            ],
        )
    }

    #[test]
    fn exact_lookup_prefers_exact_case() {
        let row = row();
        assert_eq!(row.get("ID"), Some(&RowValues::Int(2)));
        assert_eq!(row.get("id"), None);
    }

    #[test]
    fn folded_lookup_takes_leftmost_column() {
        let row = row();
        assert_eq!(row.get_ignore_case("id"), Some(&RowValues::Int(1)));
        assert_eq!(row.get_ignore_case("USER_NAME"), Some(&RowValues::Text("erick".into())));
        assert_eq!(row.get_ignore_case("missing"), None);
    }
}
