use std::sync::Arc;

use super::row::{ColumnIndex, CustomDbRow};
use crate::types::{ColumnType, RowValues};

/// One result table produced by a command.
///
/// Holds the ordered column names and their declared types once, and the rows in the
/// order the driver produced them.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
    table_name: Option<String>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
    column_types: Vec<ColumnType>,
    column_index: Arc<ColumnIndex>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - The initial capacity for the result rows
    ///
    /// # Returns
    ///
    /// A new `ResultSet` instance with preallocated capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Create an empty table with the given columns.
    ///
    /// Missing types are padded with `ColumnType::Unknown`.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, mut column_types: Vec<ColumnType>) -> ResultSet {
        column_types.resize(column_names.len(), ColumnType::Unknown);
        let mut rs = ResultSet::default();
        rs.set_column_names(Arc::new(column_names));
        rs.column_types = column_types;
        rs
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Arc::new(ColumnIndex::new(&column_names));
        self.column_types.resize(column_names.len(), ColumnType::Unknown);
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Column names as a slice; empty when no columns were reported.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.column_names.as_deref().map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    pub fn set_column_types(&mut self, mut column_types: Vec<ColumnType>) {
        column_types.resize(self.columns().len(), ColumnType::Unknown);
        self.column_types = column_types;
    }

    /// Fill every `Unknown` column type from the first non-NULL value in that column.
    pub fn infer_column_types(&mut self) {
        for (idx, ty) in self.column_types.iter_mut().enumerate() {
            if *ty != ColumnType::Unknown {
                continue;
            }
            if let Some(found) = self
                .results
                .iter()
                .filter_map(|row| row.get_by_index(idx))
                .find(|v| !v.is_null())
            {
                *ty = found.column_type();
            }
        }
    }

    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn set_table_name(&mut self, name: impl Into<String>) {
        self.table_name = Some(name.into());
    }

    /// Add a row to the result set
    ///
    /// Rows added before any column names are set are dropped.
    ///
    /// # Arguments
    ///
    /// * `row_values` - The values for this row
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(column_names) = &self.column_names {
            let row = CustomDbRow::with_index(
                Arc::clone(column_names),
                row_values,
                Arc::clone(&self.column_index),
            );
            self.results.push(row);
            self.rows_affected += 1;
        }
    }

    /// Add a row to the result set (legacy method, less efficient)
    ///
    /// # Arguments
    ///
    /// * `row` - The row to add
    pub fn add_row(&mut self, row: CustomDbRow) {
        // If column names haven't been set yet, use the ones from this row
        if self.column_names.is_none() {
            self.set_column_names(Arc::clone(&row.column_names));
        }

        self.results.push(row);
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[CustomDbRow] {
        &self.results
    }

    #[must_use]
    pub fn first_row(&self) -> Option<&CustomDbRow> {
        self.results.first()
    }
}
