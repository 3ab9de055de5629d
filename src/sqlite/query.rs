use std::sync::Arc;

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement};

use crate::error::SqlMapperError;
use crate::params::SqlParam;
use crate::query_utils::extract_column_names;
use crate::results::{QueryResult, ResultSet};
use crate::types::RowValues;

use super::params::bind_named;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlMapperError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlMapperError> {
    let value: Value = row.get(idx).map_err(SqlMapperError::SqliteError)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Run every statement in `sql` and collect one table per statement that returns
/// columns. Statements without columns run for their side effects only.
///
/// # Errors
/// Returns `SqliteError` for prepare or step failures and `ParameterError` when a
/// parameter cannot be bound.
pub fn build_query_result(
    conn: &Connection,
    sql: &str,
    params: &[SqlParam],
) -> Result<QueryResult, SqlMapperError> {
    let mut batch = Batch::new(conn, sql);
    let mut result = QueryResult::default();
    while let Some(mut stmt) = batch.next()? {
        bind_named(&mut stmt, params)?;
        if stmt.column_count() == 0 {
            stmt.raw_execute()?;
            continue;
        }
        result.push(build_result_set(&mut stmt)?);
    }
    Ok(result)
}

/// Build a result set from a prepared, bound statement.
///
/// # Errors
/// Returns `SqlMapperError::SqliteError` if stepping the statement fails.
pub fn build_result_set(stmt: &mut Statement<'_>) -> Result<ResultSet, SqlMapperError> {
    let column_names = extract_column_names(stmt.column_names(), |name| *name);
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_iter = stmt.raw_query();
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }
    result_set.infer_column_types();

    Ok(result_set)
}
