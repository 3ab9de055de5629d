use std::sync::LazyLock;

use super::{CustomDbRow, ResultSet};
use crate::conversion::{FromRowValue, convert_value};
use crate::error::{AssemblyFailure, SqlMapperError};
use crate::mapping::{self, Entity, JoinKeys, ParentKeys, map_row, map_rows};

static EMPTY_TABLE: LazyLock<ResultSet> = LazyLock::new(ResultSet::default);

/// Every result table produced by one command, in the order the backend returned them.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    tables: Vec<ResultSet>,
}

impl QueryResult {
    #[must_use]
    pub fn new(tables: Vec<ResultSet>) -> Self {
        Self { tables }
    }

    pub fn push(&mut self, table: ResultSet) {
        self.tables.push(table);
    }

    /// Table at `index`.
    ///
    /// # Errors
    /// Returns `AssemblyError(MissingTable)` when the command produced fewer tables.
    pub fn table(&self, index: usize) -> Result<&ResultSet, SqlMapperError> {
        self.tables.get(index).ok_or_else(|| {
            AssemblyFailure::MissingTable {
                index,
                available: self.tables.len(),
            }
            .into()
        })
    }

    /// First table, or an empty table when the command returned none.
    #[must_use]
    pub fn first_table(&self) -> &ResultSet {
        self.tables.first().unwrap_or(&*EMPTY_TABLE)
    }

    #[must_use]
    pub fn tables(&self) -> &[ResultSet] {
        &self.tables
    }

    #[must_use]
    pub fn into_tables(self) -> Vec<ResultSet> {
        self.tables
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Rows in the first table.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.first_table().len()
    }

    #[must_use]
    pub fn has_rows(&self) -> bool {
        self.row_count() > 0
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.first_table().columns()
    }

    #[must_use]
    pub fn rows(&self) -> &[CustomDbRow] {
        self.first_table().rows()
    }

    #[must_use]
    pub fn first_row(&self) -> Option<&CustomDbRow> {
        self.first_table().first_row()
    }

    /// Map the first table into `T`s.
    ///
    /// # Errors
    /// See [`map_rows`].
    pub fn to_list<T: Entity>(&self) -> Result<Vec<T>, SqlMapperError> {
        map_rows(self.first_table())
    }

    /// Map the first row of the first table, if any.
    ///
    /// # Errors
    /// See [`map_row`].
    pub fn first_or_default<T: Entity>(&self) -> Result<Option<T>, SqlMapperError> {
        self.first_row().map(map_row).transpose()
    }

    /// First column of the first row, coerced to `V`. NULL and an empty result give `None`.
    ///
    /// # Errors
    /// Returns `MappingError` when the value cannot be coerced.
    pub fn scalar<V: FromRowValue>(&self) -> Result<Option<V>, SqlMapperError> {
        let Some(value) = self.first_row().and_then(|row| row.get_by_index(0)) else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        convert_value::<V>(value).map(Some).map_err(|e| {
            let column = self.columns().first().map_or("", String::as_str);
            SqlMapperError::mapping("scalar", column, e.to_string())
        })
    }

    /// See [`mapping::one_to_one`].
    ///
    /// # Errors
    /// Propagates the assembly error.
    pub fn map_one_to_one<P: Entity, C: Entity>(&self, child_field: &str) -> Result<P, SqlMapperError> {
        mapping::one_to_one::<P, C>(self, child_field)
    }

    /// See [`mapping::one_to_many`].
    ///
    /// # Errors
    /// Propagates the assembly error.
    pub fn map_one_to_many<P: Entity, C: Entity>(&self, child_field: &str) -> Result<P, SqlMapperError> {
        mapping::one_to_many::<P, C>(self, child_field)
    }

    /// See [`mapping::one_to_many_grouped`].
    ///
    /// # Errors
    /// Propagates the assembly error.
    pub fn map_one_to_many_grouped<P: Entity, C: Entity>(
        &self,
        child_field: &str,
        keys: &ParentKeys,
    ) -> Result<Vec<P>, SqlMapperError> {
        mapping::one_to_many_grouped::<P, C>(self, child_field, keys)
    }

    /// See [`mapping::many_to_one`].
    ///
    /// # Errors
    /// Propagates the assembly error.
    pub fn map_many_to_one<C: Entity, P: Entity>(
        &self,
        parent_field: &str,
        keys: &ParentKeys,
    ) -> Result<Vec<C>, SqlMapperError> {
        mapping::many_to_one::<C, P>(self, parent_field, keys)
    }

    /// See [`mapping::many_to_many`].
    ///
    /// # Errors
    /// Propagates the assembly error.
    pub fn map_many_to_many<L: Entity, R: Entity, J: Entity>(
        &self,
        collection_field: &str,
        keys: &JoinKeys,
    ) -> Result<Vec<L>, SqlMapperError> {
        mapping::many_to_many::<L, R, J>(self, collection_field, keys)
    }

    /// One-to-many for every parent, with field and keys taken from the declared
    /// relationships of `P` and `C`.
    ///
    /// # Errors
    /// See [`mapping::one_to_many_grouped_related`].
    pub fn map_related<P: Entity, C: Entity>(&self) -> Result<Vec<P>, SqlMapperError> {
        mapping::one_to_many_grouped_related::<P, C>(self)
    }

    /// Many-to-many with field and keys taken from the declared relationships.
    ///
    /// # Errors
    /// See [`mapping::many_to_many_related`].
    pub fn map_many_to_many_related<L: Entity, R: Entity, J: Entity>(
        &self,
    ) -> Result<Vec<L>, SqlMapperError> {
        mapping::many_to_many_related::<L, R, J>(self)
    }
}

impl From<Vec<ResultSet>> for QueryResult {
    fn from(tables: Vec<ResultSet>) -> Self {
        Self::new(tables)
    }
}

impl From<ResultSet> for QueryResult {
    fn from(table: ResultSet) -> Self {
        Self::new(vec![table])
    }
}

impl IntoIterator for QueryResult {
    type Item = ResultSet;
    type IntoIter = std::vec::IntoIter<ResultSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}
