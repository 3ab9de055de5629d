// SQLite backend - runs commands on one rusqlite connection
//
// - config: options, builder and client constructor
// - connection: the shared connection and the `TabularSource` impl
// - params: named parameter binding
// - query: statement batches to result tables

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteSource;
pub use query::{build_query_result, build_result_set};
