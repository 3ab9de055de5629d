//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::conversion::{FromRowValue, ToRowValue};
pub use crate::error::{AssemblyFailure, SqlMapperError};
pub use crate::executor::{ClientOptions, CommandBuilder, CommandRequest, SqlClient, TabularSource};
pub use crate::mapping::{
    Entity, EntityBuilder, EntityMetadata, JoinKeys, ParentKeys, RelationKind, map_row, map_rows,
    metadata,
};
pub use crate::params::{SqlParam, params_from_map, params_from_pairs};
pub use crate::results::{CustomDbRow, QueryResult, ResultSet};
pub use crate::types::{ColumnType, CommandKind, DatabaseType, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder, SqliteSource};

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlOptions, MssqlOptionsBuilder, MssqlSource};
