use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::numeric::Numeric;
use tiberius::{ColumnType as TdsType, QueryItem, Row, Uuid};

use super::client::MssqlClient;
use super::params::bind_query_params;
use crate::error::SqlMapperError;
use crate::params::SqlParam;
use crate::query_utils::extract_column_names;
use crate::results::{QueryResult, ResultSet};
use crate::types::{ColumnType, RowValues};

/// Run a prepared command and collect one table per result set the server sends.
///
/// Result sets without rows still produce a table with their columns; statements
/// that return no columns produce nothing.
///
/// # Errors
/// Returns `MssqlError` when the server rejects the command or the stream fails.
pub async fn build_query_result(
    client: &mut MssqlClient,
    command: &str,
    params: &[SqlParam],
) -> Result<QueryResult, SqlMapperError> {
    let mut stream = bind_query_params(command, params).query(client).await?;

    let mut result = QueryResult::default();
    let mut current: Option<(ResultSet, Vec<TdsType>)> = None;
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => {
                if let Some((table, _)) = current.take() {
                    result.push(table);
                }
                let columns = meta.columns();
                let names = extract_column_names(columns, |col| col.name());
                let tds_types: Vec<TdsType> = columns.iter().map(|col| col.column_type()).collect();
                let types = tds_types.iter().map(|ty| column_type(*ty)).collect();
                current = Some((ResultSet::with_columns(names, types), tds_types));
            }
            QueryItem::Row(row) => {
                let Some((table, tds_types)) = current.as_mut() else {
                    continue;
                };
                let mut row_values = Vec::with_capacity(tds_types.len());
                for (idx, ty) in tds_types.iter().enumerate() {
                    row_values.push(extract_value(&row, idx, *ty)?);
                }
                table.add_row_values(row_values);
            }
        }
    }
    if let Some((table, _)) = current {
        result.push(table);
    }
    Ok(result)
}

/// Declared type of a SQL Server column.
#[must_use]
pub fn column_type(ty: TdsType) -> ColumnType {
    match ty {
        TdsType::Bit | TdsType::Bitn => ColumnType::Bool,
        TdsType::Int1 | TdsType::Int2 | TdsType::Int4 | TdsType::Int8 | TdsType::Intn => {
            ColumnType::Int
        }
        TdsType::Float4
        | TdsType::Float8
        | TdsType::Floatn
        | TdsType::Money
        | TdsType::Money4
        | TdsType::Decimaln
        | TdsType::Numericn => ColumnType::Float,
        TdsType::Datetime
        | TdsType::Datetime4
        | TdsType::Datetimen
        | TdsType::Datetime2
        | TdsType::Daten
        | TdsType::DatetimeOffsetn => ColumnType::Timestamp,
        TdsType::BigVarBin | TdsType::BigBinary | TdsType::Image => ColumnType::Blob,
        TdsType::Null | TdsType::SSVariant | TdsType::Udt => ColumnType::Unknown,
        _ => ColumnType::Text,
    }
}

fn int_value(row: &Row, idx: usize) -> Option<RowValues> {
    if let Ok(val) = row.try_get::<i32, _>(idx) {
        return val.map(|v| RowValues::Int(i64::from(v)));
    }
    if let Ok(val) = row.try_get::<i64, _>(idx) {
        return val.map(RowValues::Int);
    }
    if let Ok(val) = row.try_get::<i16, _>(idx) {
        return val.map(|v| RowValues::Int(i64::from(v)));
    }
    row.try_get::<u8, _>(idx)
        .ok()
        .flatten()
        .map(|v| RowValues::Int(i64::from(v)))
}

fn float_value(row: &Row, idx: usize) -> Option<RowValues> {
    if let Ok(val) = row.try_get::<f64, _>(idx) {
        return val.map(RowValues::Float);
    }
    row.try_get::<f32, _>(idx)
        .ok()
        .flatten()
        .map(|v| RowValues::Float(f64::from(v)))
}

fn numeric_value(n: Numeric) -> RowValues {
    let text = n.to_string();
    text.parse::<f64>()
        .map_or(RowValues::Text(text), RowValues::Float)
}

/// Extract a value from a row at a specific index, guided by the column's wire type.
fn extract_value(row: &Row, idx: usize, ty: TdsType) -> Result<RowValues, SqlMapperError> {
    let value = match ty {
        TdsType::Null => None,
        TdsType::Bit | TdsType::Bitn => row.try_get::<bool, _>(idx)?.map(RowValues::Bool),
        TdsType::Int1 | TdsType::Int2 | TdsType::Int4 | TdsType::Int8 | TdsType::Intn => {
            int_value(row, idx)
        }
        TdsType::Float4 | TdsType::Float8 | TdsType::Floatn | TdsType::Money | TdsType::Money4 => {
            float_value(row, idx)
        }
        TdsType::Decimaln | TdsType::Numericn => {
            row.try_get::<Numeric, _>(idx)?.map(numeric_value)
        }
        TdsType::Datetime | TdsType::Datetime4 | TdsType::Datetimen | TdsType::Datetime2 => row
            .try_get::<NaiveDateTime, _>(idx)?
            .map(RowValues::Timestamp),
        TdsType::Daten => row
            .try_get::<NaiveDate, _>(idx)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(RowValues::Timestamp),
        TdsType::DatetimeOffsetn => row
            .try_get::<DateTime<Utc>, _>(idx)?
            .map(|dt| RowValues::Timestamp(dt.naive_utc())),
        TdsType::Timen => row
            .try_get::<NaiveTime, _>(idx)?
            .map(|t| RowValues::Text(t.to_string())),
        TdsType::Guid => row
            .try_get::<Uuid, _>(idx)?
            .map(|u| RowValues::Text(u.to_string())),
        TdsType::BigVarBin | TdsType::BigBinary | TdsType::Image => row
            .try_get::<&[u8], _>(idx)?
            .map(|b| RowValues::Blob(b.to_vec())),
        _ => row
            .try_get::<&str, _>(idx)
            .ok()
            .flatten()
            .map(|s| RowValues::Text(s.to_string())),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_types_map_to_column_types() {
        assert_eq!(column_type(TdsType::Intn), ColumnType::Int);
        assert_eq!(column_type(TdsType::Bitn), ColumnType::Bool);
        assert_eq!(column_type(TdsType::Numericn), ColumnType::Float);
        assert_eq!(column_type(TdsType::Datetime2), ColumnType::Timestamp);
        assert_eq!(column_type(TdsType::NVarchar), ColumnType::Text);
        assert_eq!(column_type(TdsType::BigVarBin), ColumnType::Blob);
    }

    #[test]
    fn decimals_become_floats() {
        assert_eq!(numeric_value(Numeric::new_with_scale(12345, 2)), RowValues::Float(123.45));
    }
}
