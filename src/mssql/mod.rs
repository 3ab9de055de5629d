// MSSQL module - SQL Server backend for the command facade
//
// - config: connection options and the `SqlClient` constructors
// - client: connecting, and the `TabularSource` over one connection
// - params: named parameters to positional tiberius binds
// - query: streaming every result table into a `QueryResult`

pub mod client;
pub mod config;
pub mod params;
pub mod query;

pub use client::{MssqlClient, MssqlSource, create_mssql_client};
pub use config::{MssqlOptions, MssqlOptionsBuilder};
pub use query::build_query_result;
