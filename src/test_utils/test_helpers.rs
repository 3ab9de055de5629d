//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

/// Build a result table from literal columns and rows, inferring column types.
#[must_use]
pub fn table(columns: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let names = columns.iter().map(|c| (*c).to_string()).collect();
    let mut rs = ResultSet::with_columns(names, Vec::new());
    for row in rows {
        rs.add_row_values(row);
    }
    rs.infer_column_types();
    rs
}
