//! JSON views over result tables.
//!
//! A table serializes as an array of objects, one per row, with keys in column order.
//! A whole command result serializes as an object keyed by table name (`Table0`,
//! `Table1`, ... for unnamed tables).

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value as JsonValue};

use super::{QueryResult, ResultSet};
use crate::error::SqlMapperError;
use crate::mapping::Entity;
use crate::types::{RowValues, TIMESTAMP_FORMAT};

type JsonObject = Map<String, JsonValue>;

/// Serialize any value, compact or indented.
///
/// # Errors
/// Returns `JsonError` if `value` fails to serialize.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, SqlMapperError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

fn value_to_json(value: &RowValues) -> JsonValue {
    match value {
        RowValues::Int(i) => JsonValue::from(*i),
        RowValues::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        RowValues::Text(s) => JsonValue::String(s.clone()),
        RowValues::Bool(b) => JsonValue::Bool(*b),
        RowValues::Timestamp(dt) => JsonValue::String(dt.format(TIMESTAMP_FORMAT).to_string()),
        RowValues::Null => JsonValue::Null,
        RowValues::JSON(v) => v.clone(),
        RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
    }
}

fn json_to_value(value: JsonValue) -> RowValues {
    match value {
        JsonValue::Null => RowValues::Null,
        JsonValue::Bool(b) => RowValues::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => RowValues::Int(i),
            None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
        },
        JsonValue::String(s) => RowValues::Text(s),
        other @ (JsonValue::Array(_) | JsonValue::Object(_)) => RowValues::JSON(other),
    }
}

fn table_from_objects(objects: Vec<JsonObject>) -> ResultSet {
    let mut columns: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = ResultSet::with_columns(columns, Vec::new());
    table.results.reserve(objects.len());
    for mut object in objects {
        let row = table
            .columns()
            .iter()
            .map(|c| object.remove(c).map_or(RowValues::Null, json_to_value))
            .collect();
        table.add_row_values(row);
    }
    table.infer_column_types();
    table
}

impl ResultSet {
    /// The table as a JSON array of row objects.
    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        let columns = self.columns();
        JsonValue::Array(
            self.rows()
                .iter()
                .map(|row| {
                    let object: JsonObject = columns
                        .iter()
                        .zip(row.rows.iter())
                        .map(|(name, value)| (name.clone(), value_to_json(value)))
                        .collect();
                    JsonValue::Object(object)
                })
                .collect(),
        )
    }

    /// # Errors
    /// Returns `JsonError` if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, SqlMapperError> {
        to_json_string(&self.to_json_value(), pretty)
    }

    /// Rebuild a generic table from an array of row objects.
    ///
    /// Columns appear in the order keys are first seen; a key missing from a row reads
    /// as NULL. Blank input gives an empty table.
    ///
    /// # Errors
    /// Returns `JsonError` when the text is not an array of objects.
    pub fn from_json(text: &str) -> Result<ResultSet, SqlMapperError> {
        if text.trim().is_empty() {
            return Ok(ResultSet::default());
        }
        let objects: Vec<JsonObject> = serde_json::from_str(text)?;
        Ok(table_from_objects(objects))
    }

    /// Write the table as indented JSON.
    ///
    /// # Errors
    /// Returns `IoError` or `JsonError`.
    pub async fn save_to_json_file(&self, path: impl AsRef<Path>) -> Result<(), SqlMapperError> {
        let text = self.to_json(true)?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }
}

impl QueryResult {
    /// The first table as JSON.
    ///
    /// # Errors
    /// Returns `JsonError` if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, SqlMapperError> {
        self.first_table().to_json(pretty)
    }

    /// Every table, keyed by its name or by `Table{index}`.
    #[must_use]
    pub fn to_json_data_set_value(&self) -> JsonValue {
        let object: JsonObject = self
            .tables()
            .iter()
            .enumerate()
            .map(|(i, table)| {
                let name = table
                    .table_name()
                    .map_or_else(|| format!("Table{i}"), str::to_string);
                (name, table.to_json_value())
            })
            .collect();
        JsonValue::Object(object)
    }

    /// # Errors
    /// Returns `JsonError` if serialization fails.
    pub fn to_json_data_set(&self, pretty: bool) -> Result<String, SqlMapperError> {
        to_json_string(&self.to_json_data_set_value(), pretty)
    }

    /// Map the first table into `T`s and serialize them.
    ///
    /// # Errors
    /// Propagates mapping errors and returns `JsonError` if serialization fails.
    pub fn to_json_typed<T: Entity + Serialize>(&self, pretty: bool) -> Result<String, SqlMapperError> {
        let items = self.to_list::<T>()?;
        to_json_string(&items, pretty)
    }

    /// Deserialize a JSON array into `T`s. Blank input gives an empty list.
    ///
    /// # Errors
    /// Returns `JsonError` when the text does not describe a list of `T`.
    pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, SqlMapperError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Rebuild every table from the output of [`QueryResult::to_json_data_set`].
    ///
    /// Tables keep their key as table name, in document order.
    ///
    /// # Errors
    /// Returns `JsonError` when the text is not an object of row-object arrays.
    pub fn from_json_data_set(text: &str) -> Result<QueryResult, SqlMapperError> {
        if text.trim().is_empty() {
            return Ok(QueryResult::default());
        }
        let document: Map<String, JsonValue> = serde_json::from_str(text)?;
        let mut result = QueryResult::default();
        for (name, rows) in document {
            let objects: Vec<JsonObject> = serde_json::from_value(rows)?;
            let mut table = table_from_objects(objects);
            table.set_table_name(name);
            result.push(table);
        }
        Ok(result)
    }

    /// Write every table as an indented JSON data set.
    ///
    /// # Errors
    /// Returns `IoError` or `JsonError`.
    pub async fn save_to_json_file(&self, path: impl AsRef<Path>) -> Result<(), SqlMapperError> {
        let text = self.to_json_data_set(true)?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }

    /// Read a JSON array of `T`s from a file.
    ///
    /// # Errors
    /// Returns `IoError` when the file cannot be read and `JsonError` when it does not
    /// hold a list of `T`.
    pub async fn from_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, SqlMapperError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::table;
    use crate::types::ColumnType;

    fn people() -> ResultSet {
        table(
            &["Id", "Name", "Score"],
            vec![
                vec![RowValues::Int(1), RowValues::Text("ana".into()), RowValues::Float(1.5)],
                vec![RowValues::Int(2), RowValues::Null, RowValues::Float(2.0)],
            ],
        )
    }

    #[test]
    fn keys_follow_column_order() {
        let text = people().to_json(false).unwrap();
        assert_eq!(
            text,
            r#"[{"Id":1,"Name":"ana","Score":1.5},{"Id":2,"Name":null,"Score":2.0}]"#
        );
    }

    #[test]
    fn tables_are_keyed_by_name_or_position() {
        let mut named = people();
        named.set_table_name("People");
        let result = QueryResult::from(vec![named, table(&["X"], vec![])]);
        let value = result.to_json_data_set_value();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["People", "Table1"]);
    }

    #[test]
    fn generic_tables_come_back_from_json() {
        let text = r#"[{"Id":1,"Name":"ana"},{"Id":2,"Extra":true}]"#;
        let rebuilt = ResultSet::from_json(text).unwrap();
        assert_eq!(rebuilt.columns(), ["Id", "Name", "Extra"]);
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt.rows()[1].get("Name"), Some(&RowValues::Null));
        assert_eq!(rebuilt.column_types()[0], ColumnType::Int);
        assert!(ResultSet::from_json("  ").unwrap().is_empty());
        assert!(ResultSet::from_json("{}").is_err());
    }

    #[test]
    fn data_sets_round_trip() {
        let mut named = people();
        named.set_table_name("People");
        let original = QueryResult::from(vec![named]);
        let text = original.to_json_data_set(true).unwrap();
        let rebuilt = QueryResult::from_json_data_set(&text).unwrap();
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.first_table().table_name(), Some("People"));
        assert_eq!(rebuilt.to_json(false).unwrap(), original.to_json(false).unwrap());
    }

    #[test]
    fn blank_text_is_an_empty_list() {
        let items: Vec<serde_json::Value> = QueryResult::from_json("").unwrap();
        assert!(items.is_empty());
    }
}
