//! Async command facade over `SQLite` and SQL Server that hands back every result
//! table a command produces, plus a relational mapper that turns those tables into
//! typed object graphs.
//!
//! Entities describe their fields and relationships once through [`Entity`]; the
//! description is cached per type and drives row mapping and graph assembly.
//!
//! ```rust,no_run
//! use sql_mapper::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Entity for User {
//!     fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
//!         builder
//!             .field("Id", |u| &u.id, |u| &mut u.id)
//!             .field("Name", |u| &u.name, |u| &mut u.name)
//!             .primary_key("Id")
//!     }
//! }
//!
//! # async fn demo() -> Result<(), SqlMapperError> {
//! let client = SqlClient::new_sqlite("file::memory:".to_string()).await?;
//! let users: Vec<User> = client.query("SELECT 1 AS Id, 'erick' AS Name").to_list().await?;
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

pub mod conversion;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod params;
pub mod prelude;
mod query_utils;
pub mod results;
pub mod test_utils;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use conversion::{ConversionError, FromRowValue, ToRowValue, convert_value};
pub use error::{AssemblyFailure, SqlMapperError};
pub use executor::{ClientOptions, CommandBuilder, CommandRequest, SqlClient, TabularSource};
pub use mapping::{Entity, EntityBuilder, EntityMetadata, RelationKind, metadata};
pub use params::SqlParam;
pub use results::{CustomDbRow, QueryResult, ResultSet};
pub use types::{ColumnType, CommandKind, DatabaseType, RowValues};
