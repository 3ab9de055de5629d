//! Assembly of typed object graphs from the tables of one command.
//!
//! Every strategy maps whole tables first and then stitches the entities together by
//! key value. A call either returns the complete graph or fails; nothing partial is
//! handed back.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::descriptor::{Entity, FieldDescriptor, NavigationField, RelationKind};
use super::keys::KeyValue;
use super::registry::{EntityMetadata, metadata};
use super::row_mapper::{map_row_with, map_rows_with};
use crate::error::{AssemblyFailure, SqlMapperError};
use crate::results::{CustomDbRow, QueryResult, ResultSet};
use crate::types::RowValues;

/// Key fields correlating a parent table with its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentKeys {
    /// Key field on the parent.
    pub parent_key: String,
    /// Field on the child holding the parent's key.
    pub child_foreign_key: String,
}

impl ParentKeys {
    #[must_use]
    pub fn new(parent_key: impl Into<String>, child_foreign_key: impl Into<String>) -> Self {
        Self {
            parent_key: parent_key.into(),
            child_foreign_key: child_foreign_key.into(),
        }
    }
}

impl Default for ParentKeys {
    fn default() -> Self {
        Self::new("Id", "ParentId")
    }
}

/// Key fields of a many-to-many assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    pub left_key: String,
    pub right_key: String,
    /// Field on the join entity holding the left key.
    pub join_left_key: String,
    /// Field on the join entity holding the right key.
    pub join_right_key: String,
}

impl JoinKeys {
    #[must_use]
    pub fn new(
        left_key: impl Into<String>,
        right_key: impl Into<String>,
        join_left_key: impl Into<String>,
        join_right_key: impl Into<String>,
    ) -> Self {
        Self {
            left_key: left_key.into(),
            right_key: right_key.into(),
            join_left_key: join_left_key.into(),
            join_right_key: join_right_key.into(),
        }
    }
}

impl Default for JoinKeys {
    fn default() -> Self {
        Self::new("Id", "Id", "LeftId", "RightId")
    }
}

fn table(result: &QueryResult, index: usize) -> Result<&ResultSet, SqlMapperError> {
    result.table(index)
}

fn missing_field(entity: &str, field: &str) -> SqlMapperError {
    AssemblyFailure::MissingField {
        entity: entity.to_string(),
        field: field.to_string(),
    }
    .into()
}

fn key_field<'m, T: Entity>(
    meta: &'m EntityMetadata<T>,
    name: &str,
) -> Result<&'m FieldDescriptor<T>, SqlMapperError> {
    meta.field(name)
        .ok_or_else(|| missing_field(meta.entity_name(), name))
}

fn list_field<'m, T: Entity, C: Entity>(
    meta: &'m EntityMetadata<T>,
    name: &str,
) -> Result<&'m NavigationField<T>, SqlMapperError> {
    meta.navigation(name)
        .filter(|nav| nav.holds_list_of::<C>())
        .ok_or_else(|| missing_field(meta.entity_name(), name))
}

fn single_field<'m, T: Entity, C: Entity>(
    meta: &'m EntityMetadata<T>,
    name: &str,
) -> Result<&'m NavigationField<T>, SqlMapperError> {
    meta.navigation(name)
        .filter(|nav| nav.holds_one_of::<C>())
        .ok_or_else(|| missing_field(meta.entity_name(), name))
}

/// Key of `row` under `field`, read from the column value so a NULL or missing column
/// has no key whatever the field type defaults to.
fn row_key<T>(field: &FieldDescriptor<T>, row: &CustomDbRow) -> Option<KeyValue> {
    KeyValue::from_value(row_value(field, row))
}

fn row_value<'r, T>(field: &FieldDescriptor<T>, row: &'r CustomDbRow) -> &'r RowValues {
    row.find_column(field.column())
        .and_then(|idx| row.get_by_index(idx))
        .unwrap_or(&RowValues::Null)
}

/// Map every row of `table` alongside its key under `key`.
fn map_keyed<T: Entity>(
    meta: &EntityMetadata<T>,
    table: &ResultSet,
    key: &FieldDescriptor<T>,
) -> Result<Vec<(T, Option<KeyValue>)>, SqlMapperError> {
    table
        .rows()
        .iter()
        .map(|row| Ok((map_row_with(meta, row)?, row_key(key, row))))
        .collect()
}

fn first_parent<P: Entity>(
    meta: &EntityMetadata<P>,
    parents: &ResultSet,
) -> Result<P, SqlMapperError> {
    let row = parents.first_row().ok_or_else(|| AssemblyFailure::MissingParent {
        entity: meta.entity_name().to_string(),
    })?;
    map_row_with(meta, row)
}

/// Table 0 row 0 becomes the parent; table 1 row 0, when present, is stored in
/// `child_field`. An empty child table leaves the field untouched.
///
/// # Errors
/// `MissingParent` when table 0 is empty, `MissingField` when `P` has no single-valued
/// navigation `child_field` holding `C`, `MissingTable` when fewer than two tables came
/// back.
pub fn one_to_one<P: Entity, C: Entity>(
    result: &QueryResult,
    child_field: &str,
) -> Result<P, SqlMapperError> {
    let parent_meta = metadata::<P>()?;
    let child_meta = metadata::<C>()?;
    let nav = single_field::<P, C>(&parent_meta, child_field)?;

    let mut parent = first_parent(&parent_meta, table(result, 0)?)?;
    if let Some(row) = table(result, 1)?.first_row() {
        let child = map_row_with(&child_meta, row)?;
        if !nav.assign(&mut parent, Some(child)) {
            return Err(missing_field(parent_meta.entity_name(), child_field));
        }
    }
    Ok(parent)
}

/// Table 0 row 0 becomes the parent; every row of table 1 goes into `child_field`,
/// which is always assigned, even with an empty list.
///
/// # Errors
/// As [`one_to_one`], with `child_field` required to be a list of `C`.
pub fn one_to_many<P: Entity, C: Entity>(
    result: &QueryResult,
    child_field: &str,
) -> Result<P, SqlMapperError> {
    let parent_meta = metadata::<P>()?;
    let child_meta = metadata::<C>()?;
    let nav = list_field::<P, C>(&parent_meta, child_field)?;

    let mut parent = first_parent(&parent_meta, table(result, 0)?)?;
    let children = map_rows_with(&child_meta, table(result, 1)?)?;
    if !nav.assign(&mut parent, children) {
        return Err(missing_field(parent_meta.entity_name(), child_field));
    }
    Ok(parent)
}

/// Every row of table 0 becomes a parent; children from table 1 are grouped by
/// `keys.child_foreign_key` and each parent receives the group matching its
/// `keys.parent_key`, or an empty list.
///
/// Children matching no parent (including NULL foreign keys) are dropped and reported
/// with a warning.
///
/// # Errors
/// `MissingField` for an unknown key or navigation field, `MissingTable` when fewer
/// than two tables came back.
pub fn one_to_many_grouped<P: Entity, C: Entity>(
    result: &QueryResult,
    child_field: &str,
    keys: &ParentKeys,
) -> Result<Vec<P>, SqlMapperError> {
    let parent_meta = metadata::<P>()?;
    let child_meta = metadata::<C>()?;
    let nav = list_field::<P, C>(&parent_meta, child_field)?;
    let parent_key = key_field(&parent_meta, &keys.parent_key)?;
    let child_key = key_field(&child_meta, &keys.child_foreign_key)?;

    let parents = map_keyed(&parent_meta, table(result, 0)?, parent_key)?;
    let children = map_keyed(&child_meta, table(result, 1)?, child_key)?;

    let mut groups: HashMap<KeyValue, Vec<C>> = HashMap::new();
    let mut unkeyed = 0usize;
    for (child, key) in children {
        match key {
            Some(key) => groups.entry(key).or_default().push(child),
            None => unkeyed += 1,
        }
    }

    let mut claimed = HashSet::new();
    let mut assembled = Vec::with_capacity(parents.len());
    for (mut parent, key) in parents {
        let list = match key {
            Some(key) => {
                let list = groups.get(&key).cloned().unwrap_or_default();
                claimed.insert(key);
                list
            }
            None => Vec::new(),
        };
        if !nav.assign(&mut parent, list) {
            return Err(missing_field(parent_meta.entity_name(), child_field));
        }
        assembled.push(parent);
    }

    let orphans = unkeyed
        + groups
            .iter()
            .filter(|(key, _)| !claimed.contains(*key))
            .map(|(_, list)| list.len())
            .sum::<usize>();
    if orphans > 0 {
        warn!(
            parent = parent_meta.entity_name(),
            child = child_meta.entity_name(),
            foreign_key = child_key.name(),
            orphans,
            "dropping child rows that match no parent"
        );
    }
    Ok(assembled)
}

/// Every row of table 0 becomes a child; table 1 holds the parents. Each child whose
/// `keys.child_foreign_key` matches a parent's `keys.parent_key` gets that parent stored
/// in `parent_field`; the rest keep `None`.
///
/// # Errors
/// `DuplicateKey` when two parents share a key, `MissingField` for an unknown key or
/// navigation field, `MissingTable` when fewer than two tables came back.
pub fn many_to_one<C: Entity, P: Entity>(
    result: &QueryResult,
    parent_field: &str,
    keys: &ParentKeys,
) -> Result<Vec<C>, SqlMapperError> {
    let child_meta = metadata::<C>()?;
    let parent_meta = metadata::<P>()?;
    let nav = single_field::<C, P>(&child_meta, parent_field)?;
    let parent_key = key_field(&parent_meta, &keys.parent_key)?;
    let child_key = key_field(&child_meta, &keys.child_foreign_key)?;

    let children = map_keyed(&child_meta, table(result, 0)?, child_key)?;
    let lookup = unique_lookup(&parent_meta, parent_key, table(result, 1)?)?;

    let mut assembled = Vec::with_capacity(children.len());
    for (mut child, key) in children {
        if let Some(parent) = key.and_then(|key| lookup.get(&key)) {
            if !nav.assign(&mut child, Some(parent.clone())) {
                return Err(missing_field(child_meta.entity_name(), parent_field));
            }
        }
        assembled.push(child);
    }
    Ok(assembled)
}

/// Table 0 holds left entities, table 1 right entities and table 2 the join rows.
/// Each left entity receives, in join-row order, the right entities its join rows
/// reference.
///
/// # Errors
/// `DuplicateKey` when two right rows share a key, `DanglingReference` when a join row
/// of some left entity names a right key that does not exist, `MissingField` for an
/// unknown key or navigation field, `MissingTable` when fewer than three tables came
/// back.
pub fn many_to_many<L: Entity, R: Entity, J: Entity>(
    result: &QueryResult,
    collection_field: &str,
    keys: &JoinKeys,
) -> Result<Vec<L>, SqlMapperError> {
    let left_meta = metadata::<L>()?;
    let right_meta = metadata::<R>()?;
    let join_meta = metadata::<J>()?;
    let nav = list_field::<L, R>(&left_meta, collection_field)?;
    let left_key = key_field(&left_meta, &keys.left_key)?;
    let right_key = key_field(&right_meta, &keys.right_key)?;
    let join_left = key_field(&join_meta, &keys.join_left_key)?;
    let join_right = key_field(&join_meta, &keys.join_right_key)?;

    let lefts = map_keyed(&left_meta, table(result, 0)?, left_key)?;
    let lookup = unique_lookup(&right_meta, right_key, table(result, 1)?)?;

    // Join rows are only read for their keys; the right key keeps its raw value for
    // error reporting.
    let mut links: HashMap<KeyValue, Vec<&RowValues>> = HashMap::new();
    for row in table(result, 2)?.rows() {
        let Some(key) = row_key(join_left, row) else {
            continue;
        };
        links.entry(key).or_default().push(row_value(join_right, row));
    }

    let mut assembled = Vec::with_capacity(lefts.len());
    for (mut left, key) in lefts {
        let related = key
            .and_then(|key| links.get(&key))
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|value| {
                KeyValue::from_value(value)
                    .and_then(|key| lookup.get(&key))
                    .cloned()
                    .ok_or_else(|| {
                        SqlMapperError::from(AssemblyFailure::DanglingReference {
                            entity: right_meta.entity_name().to_string(),
                            field: right_key.name().to_string(),
                            key: value.to_string(),
                        })
                    })
            })
            .collect::<Result<Vec<R>, _>>()?;
        if !nav.assign(&mut left, related) {
            return Err(missing_field(left_meta.entity_name(), collection_field));
        }
        assembled.push(left);
    }
    Ok(assembled)
}

fn unique_lookup<T: Entity>(
    meta: &EntityMetadata<T>,
    key: &FieldDescriptor<T>,
    table: &ResultSet,
) -> Result<HashMap<KeyValue, T>, SqlMapperError> {
    let mut lookup = HashMap::with_capacity(table.rows().len());
    for row in table.rows() {
        let entity = map_row_with(meta, row)?;
        let Some(k) = row_key(key, row) else {
            continue;
        };
        if lookup.insert(k, entity).is_some() {
            return Err(AssemblyFailure::DuplicateKey {
                entity: meta.entity_name().to_string(),
                field: key.name().to_string(),
                key: row_value(key, row).to_string(),
            }
            .into());
        }
    }
    Ok(lookup)
}

/// [`one_to_one`] using the one-to-one field `P` declares for `C`.
///
/// # Errors
/// `MetadataError` when no such relationship is declared, otherwise as [`one_to_one`].
pub fn one_to_one_related<P: Entity, C: Entity>(result: &QueryResult) -> Result<P, SqlMapperError> {
    let field = metadata::<P>()?
        .relation_to::<C>(RelationKind::OneToOne)?
        .name()
        .to_string();
    one_to_one::<P, C>(result, &field)
}

/// [`one_to_many`] using the one-to-many field `P` declares for `C`.
///
/// # Errors
/// `MetadataError` when no such relationship is declared, otherwise as [`one_to_many`].
pub fn one_to_many_related<P: Entity, C: Entity>(result: &QueryResult) -> Result<P, SqlMapperError> {
    let field = metadata::<P>()?
        .relation_to::<C>(RelationKind::OneToMany)?
        .name()
        .to_string();
    one_to_many::<P, C>(result, &field)
}

/// [`one_to_many_grouped`] with the navigation field and keys taken from metadata:
/// `P`'s primary key and `C`'s foreign key to `P`.
///
/// # Errors
/// `MetadataError` when a declaration is missing, otherwise as [`one_to_many_grouped`].
pub fn one_to_many_grouped_related<P: Entity, C: Entity>(
    result: &QueryResult,
) -> Result<Vec<P>, SqlMapperError> {
    let parent_meta = metadata::<P>()?;
    let field = parent_meta.relation_to::<C>(RelationKind::OneToMany)?.name();
    let keys = ParentKeys::new(
        parent_meta.primary_key()?.name(),
        metadata::<C>()?.foreign_key_to::<P>()?.name(),
    );
    one_to_many_grouped::<P, C>(result, field, &keys)
}

/// [`many_to_one`] with the navigation field and keys taken from metadata.
///
/// # Errors
/// `MetadataError` when a declaration is missing, otherwise as [`many_to_one`].
pub fn many_to_one_related<C: Entity, P: Entity>(
    result: &QueryResult,
) -> Result<Vec<C>, SqlMapperError> {
    let child_meta = metadata::<C>()?;
    let field = child_meta.relation_to::<P>(RelationKind::ManyToOne)?.name();
    let keys = ParentKeys::new(
        metadata::<P>()?.primary_key()?.name(),
        child_meta.foreign_key_to::<P>()?.name(),
    );
    many_to_one::<C, P>(result, field, &keys)
}

/// [`many_to_many`] with the collection field and keys taken from metadata: primary
/// keys of `L` and `R`, and `J`'s foreign keys to each of them.
///
/// # Errors
/// `MetadataError` when a declaration is missing or the relationship names a different
/// join entity, otherwise as [`many_to_many`].
pub fn many_to_many_related<L: Entity, R: Entity, J: Entity>(
    result: &QueryResult,
) -> Result<Vec<L>, SqlMapperError> {
    let left_meta = metadata::<L>()?;
    let nav = left_meta.relation_to::<R>(RelationKind::ManyToMany)?;
    if nav.join_type() != Some(std::any::TypeId::of::<J>()) {
        return Err(SqlMapperError::metadata(format!(
            "{}.{} is joined through {}, not {}",
            left_meta.entity_name(),
            nav.name(),
            nav.join_name().unwrap_or("nothing"),
            J::entity_name()
        )));
    }
    let join_meta = metadata::<J>()?;
    let keys = JoinKeys::new(
        left_meta.primary_key()?.name(),
        metadata::<R>()?.primary_key()?.name(),
        join_meta.foreign_key_to::<L>()?.name(),
        join_meta.foreign_key_to::<R>()?.name(),
    );
    many_to_many::<L, R, J>(result, nav.name(), &keys)
}
