use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqlMapperError;
use crate::params::SqlParam;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Bind every parameter the statement names.
///
/// A parameter `@Id` binds to `@Id`, `:Id` or `$Id` in the SQL; parameters the
/// statement does not mention are skipped, and unbound placeholders stay NULL.
///
/// # Errors
/// Returns `ParameterError` when a value cannot be bound.
pub fn bind_named(stmt: &mut Statement<'_>, params: &[SqlParam]) -> Result<usize, SqlMapperError> {
    let mut bound = 0;
    for param in params {
        let bare = param.bare_name();
        for marker in ['@', ':', '$'] {
            let Some(index) = stmt.parameter_index(&format!("{marker}{bare}"))? else {
                continue;
            };
            stmt.raw_bind_parameter(index, row_value_to_sqlite_value(&param.value))
                .map_err(|e| {
                    SqlMapperError::ParameterError(format!("cannot bind {}: {e}", param.name))
                })?;
            bound += 1;
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timestamps_bind_as_text() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::Timestamp(dt)),
            Value::Text("2024-01-02 03:04:05".into())
        );
        assert_eq!(row_value_to_sqlite_value(&RowValues::Bool(true)), Value::Integer(1));
    }

    #[test]
    fn every_marker_style_binds() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT @a, :b, $c, :unused").unwrap();
        let params = vec![
            SqlParam::int("a", 1),
            SqlParam::int("@b", 2),
            SqlParam::int(":c", 3),
            SqlParam::int("missing", 4),
        ];
        assert_eq!(bind_named(&mut stmt, &params).unwrap(), 3);
        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(row.get::<_, i64>(0).unwrap(), 1);
        assert_eq!(row.get::<_, i64>(2).unwrap(), 3);
        assert_eq!(row.get::<_, Option<i64>>(3).unwrap(), None);
    }
}
