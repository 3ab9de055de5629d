use std::fmt::Write;

use tiberius::Query;

use crate::error::SqlMapperError;
use crate::params::SqlParam;
use crate::types::RowValues;

/// T-SQL type a parameter is declared with.
#[must_use]
pub fn sql_type_name(value: &RowValues) -> &'static str {
    match value {
        RowValues::Int(_) => "BIGINT",
        RowValues::Float(_) => "FLOAT",
        RowValues::Bool(_) => "BIT",
        RowValues::Timestamp(_) => "DATETIME2",
        RowValues::Blob(_) => "VARBINARY(MAX)",
        RowValues::Text(_) | RowValues::JSON(_) | RowValues::Null => "NVARCHAR(MAX)",
    }
}

fn checked_name(param: &SqlParam) -> Result<&str, SqlMapperError> {
    let bare = param.bare_name();
    let valid = bare
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && bare.chars().all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        Ok(bare)
    } else {
        Err(SqlMapperError::ParameterError(format!(
            "invalid parameter name {:?}",
            param.name
        )))
    }
}

/// Bracket-quote a possibly schema-qualified object name.
pub(crate) fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| {
            let part = part.trim();
            if part.starts_with('[') && part.ends_with(']') && part.len() >= 2 {
                part.to_string()
            } else {
                format!("[{}]", part.replace(']', "]]"))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Prefix `sql` with one `DECLARE` per parameter so the text can keep using `@Name`
/// while the values travel as positional `@P1..@Pn` binds.
///
/// # Errors
/// Returns `ParameterError` for a name that is not a plain identifier.
pub fn text_command(sql: &str, params: &[SqlParam]) -> Result<String, SqlMapperError> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }
    let mut command = String::with_capacity(sql.len() + params.len() * 40);
    for (i, param) in params.iter().enumerate() {
        let name = checked_name(param)?;
        let _ = writeln!(
            command,
            "DECLARE @{name} {} = @P{};",
            sql_type_name(&param.value),
            i + 1
        );
    }
    command.push_str(sql);
    Ok(command)
}

/// `EXEC [proc] @A = @P1, @B = @P2;`
///
/// # Errors
/// Returns `ParameterError` for a name that is not a plain identifier, and
/// `ConfigError` for a blank procedure name.
pub fn procedure_command(name: &str, params: &[SqlParam]) -> Result<String, SqlMapperError> {
    if name.trim().is_empty() {
        return Err(SqlMapperError::ConfigError(
            "stored procedure name is empty".to_string(),
        ));
    }
    let mut command = format!("EXEC {}", quote_identifier(name));
    for (i, param) in params.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        let _ = write!(command, "{sep}@{} = @P{}", checked_name(param)?, i + 1);
    }
    command.push(';');
    Ok(command)
}

/// Bind parameter values positionally, in list order.
pub fn bind_query_params<'a>(command: &'a str, params: &[SqlParam]) -> Query<'a> {
    let mut query = Query::new(command);
    for param in params {
        match &param.value {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.clone()),
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Timestamp(dt) => query.bind(*dt),
            RowValues::Null => query.bind(Option::<String>::None),
            RowValues::JSON(jsval) => query.bind(jsval.to_string()),
            RowValues::Blob(bytes) => query.bind(bytes.clone()),
        }
    }
    query
}
