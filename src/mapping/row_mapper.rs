use tracing::warn;

use super::descriptor::Entity;
use super::registry::{EntityMetadata, metadata};
use crate::error::SqlMapperError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Map one row into a fresh `T`.
///
/// Columns are matched to fields ignoring case. NULL leaves the field at its default.
/// A value that cannot be coerced is skipped with a warning.
///
/// # Errors
/// Returns `MappingError` when a required field gets NULL (or has no column) and its
/// type cannot hold NULL, and `MetadataError` when `T`'s declarations are invalid.
pub fn map_row<T: Entity>(row: &CustomDbRow) -> Result<T, SqlMapperError> {
    let meta = metadata::<T>()?;
    map_row_with(&meta, row)
}

/// Map every row of `table`, in row order.
///
/// # Errors
/// Fails on the first row `map_row` rejects.
pub fn map_rows<T: Entity>(table: &ResultSet) -> Result<Vec<T>, SqlMapperError> {
    let meta = metadata::<T>()?;
    map_rows_with(&meta, table)
}

pub(crate) fn map_rows_with<T: Entity>(
    meta: &EntityMetadata<T>,
    table: &ResultSet,
) -> Result<Vec<T>, SqlMapperError> {
    table.rows().iter().map(|row| map_row_with(meta, row)).collect()
}

pub(crate) fn map_row_with<T: Entity>(
    meta: &EntityMetadata<T>,
    row: &CustomDbRow,
) -> Result<T, SqlMapperError> {
    let mut entity = T::default();
    for field in meta.fields() {
        let value = row
            .find_column(field.column())
            .and_then(|idx| row.get_by_index(idx));
        let Some(value) = value.filter(|v| !v.is_null()) else {
            if field.is_required() && !field.is_nullable() {
                return Err(SqlMapperError::mapping(
                    meta.entity_name(),
                    field.name(),
                    format!(
                        "column `{}` is NULL or missing and {} cannot hold NULL",
                        field.column(),
                        field.type_name()
                    ),
                ));
            }
            continue;
        };
        if let Err(e) = field.assign(&mut entity, value) {
            warn!(
                entity = meta.entity_name(),
                field = field.name(),
                column = field.column(),
                error = %e,
                "skipping field that failed to convert"
            );
        }
    }
    Ok(entity)
}

/// Read `entity` back out in the order of `columns`.
///
/// Columns with no matching field come out as NULL.
///
/// # Errors
/// Returns `MetadataError` when `T`'s declarations are invalid.
pub fn entity_to_row<T: Entity>(
    entity: &T,
    columns: &[String],
) -> Result<Vec<RowValues>, SqlMapperError> {
    let meta = metadata::<T>()?;
    Ok(columns
        .iter()
        .map(|column| {
            meta.fields()
                .iter()
                .find(|f| f.column().eq_ignore_ascii_case(column))
                .map_or(RowValues::Null, |f| f.read(entity))
        })
        .collect())
}

/// Build a table with one column per registered field and one row per entity.
///
/// # Errors
/// Returns `MetadataError` when `T`'s declarations are invalid.
pub fn entities_to_table<T: Entity>(entities: &[T]) -> Result<ResultSet, SqlMapperError> {
    let meta = metadata::<T>()?;
    let columns: Vec<String> = meta.fields().iter().map(|f| f.column().to_string()).collect();
    let mut table = ResultSet::with_columns(columns, Vec::new());
    table.results.reserve(entities.len());
    for entity in entities {
        table.add_row_values(meta.fields().iter().map(|f| f.read(entity)).collect());
    }
    table.infer_column_types();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EntityBuilder;
    use crate::test_utils::table;
    use chrono::NaiveDateTime;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Account {
        id: i64,
        name: String,
        balance: f64,
        active: bool,
        nickname: Option<String>,
        opened: Option<NaiveDateTime>,
    }

    impl Entity for Account {
        fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
            builder
                .field("Id", |a| &a.id, |a| &mut a.id)
                .required()
                .field("Name", |a| &a.name, |a| &mut a.name)
                .field("Balance", |a| &a.balance, |a| &mut a.balance)
                .field("Active", |a| &a.active, |a| &mut a.active)
                .field_as("Nickname", "nick_name", |a| &a.nickname, |a| &mut a.nickname)
                .required()
                .field("Opened", |a| &a.opened, |a| &mut a.opened)
                .primary_key("Id")
        }
    }

    fn accounts() -> ResultSet {
        table(
            &["id", "NAME", "balance", "active", "nick_name", "opened", "ignored"],
            vec![
                vec![
                    RowValues::Int(1),
                    RowValues::Text("erick".into()),
                    RowValues::Text("10.5".into()),
                    RowValues::Int(1),
                    RowValues::Null,
                    RowValues::Text("2024-01-02 03:04:05".into()),
                    RowValues::Int(99),
                ],
                vec![
                    RowValues::Int(2),
                    RowValues::Null,
                    RowValues::Text("not a number".into()),
                    RowValues::Bool(false),
                    RowValues::Text("bo".into()),
                    RowValues::Null,
                    RowValues::Null,
                ],
            ],
        )
    }

    #[test]
    fn maps_columns_ignoring_case_and_coerces() {
        let rows: Vec<Account> = map_rows(&accounts()).unwrap();
        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.name, "erick");
        assert!((first.balance - 10.5).abs() < f64::EPSILON);
        assert!(first.active);
        assert_eq!(first.nickname, None);
        assert!(first.opened.is_some());
    }

    #[test]
    fn bad_values_are_skipped_and_nulls_leave_defaults() {
        let rows: Vec<Account> = map_rows(&accounts()).unwrap();
        let second = &rows[1];
        assert_eq!(second.id, 2);
        assert_eq!(second.name, "");
        assert!(second.balance.abs() < f64::EPSILON);
        assert_eq!(second.nickname.as_deref(), Some("bo"));
    }

    #[test]
    fn required_null_field_fails() {
        let t = table(&["Id", "Name"], vec![vec![RowValues::Null, RowValues::Text("x".into())]]);
        let err = map_rows::<Account>(&t).unwrap_err();
        assert!(
            matches!(&err, SqlMapperError::MappingError { field, .. } if field == "Id"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn mapping_is_deterministic_and_round_trips() {
        let t = accounts();
        let once: Vec<Account> = map_rows(&t).unwrap();
        let twice: Vec<Account> = map_rows(&t).unwrap();
        assert_eq!(once, twice);

        let columns = vec!["Id".to_string(), "Name".to_string(), "nick_name".to_string()];
        let row = entity_to_row(&once[0], &columns).unwrap();
        assert_eq!(
            row,
            vec![RowValues::Int(1), RowValues::Text("erick".into()), RowValues::Null]
        );
    }

    #[test]
    fn entities_convert_back_to_a_table() {
        let rows: Vec<Account> = map_rows(&accounts()).unwrap();
        let rebuilt = entities_to_table(&rows).unwrap();
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt.columns()[4], "nick_name");
        let again: Vec<Account> = map_rows(&rebuilt).unwrap();
        assert_eq!(again, rows);
    }
}
