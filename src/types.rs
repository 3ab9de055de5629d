use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

/// Values that can be stored in a result row or used as command parameters.
///
/// Every backend materializes its rows into this enum, so the mapper never has to
/// branch on driver types:
/// ```rust
/// use sql_mapper::prelude::*;
///
/// let row = vec![
///     RowValues::Int(1),
///     RowValues::Text("erick".into()),
///     RowValues::Null,
/// ];
/// assert!(row[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value ("no value", distinct from zero or the empty string)
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            return parse_timestamp(s);
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// The column type this value would naturally be declared as.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            RowValues::Int(_) => ColumnType::Int,
            RowValues::Float(_) => ColumnType::Float,
            RowValues::Text(_) => ColumnType::Text,
            RowValues::Bool(_) => ColumnType::Bool,
            RowValues::Timestamp(_) => ColumnType::Timestamp,
            RowValues::Null => ColumnType::Unknown,
            RowValues::JSON(_) => ColumnType::Json,
            RowValues::Blob(_) => ColumnType::Blob,
        }
    }
}

impl std::fmt::Display for RowValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => write!(f, "'{s}'"),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(dt) => write!(f, "{}", dt.format(TIMESTAMP_FORMAT)),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Canonical text form used when timestamps leave the crate as strings.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse the timestamp layouts drivers and JSON documents commonly produce.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    let trimmed = s.trim();
    for layout in LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(dt);
        }
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Declared value type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
    Json,
    Blob,
    /// The driver reported nothing usable and no value was seen.
    #[default]
    Unknown,
}

/// The database type supported by this crate
#[derive(Debug, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// `SQLite` database
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// SQL Server database
    #[cfg(feature = "mssql")]
    Mssql,
}

/// How the command text is interpreted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// One or more SQL statements.
    #[default]
    Text,
    /// The name of a stored procedure.
    StoredProcedure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_zero_and_one() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
    }

    #[test]
    fn timestamps_parse_from_common_layouts() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(13, 30, 0))
            .unwrap();
        for text in ["2024-05-01 13:30:00", "2024-05-01T13:30:00", "2024-05-01 13:30:00.000"] {
            assert_eq!(RowValues::Text(text.into()).as_timestamp(), Some(expected));
        }
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn null_is_distinct_from_empty() {
        assert!(RowValues::Null.is_null());
        assert!(!RowValues::Text(String::new()).is_null());
        assert!(!RowValues::Int(0).is_null());
    }
}
