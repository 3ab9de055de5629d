// Result tables - the in-memory form of everything a command returns
//
// - row: one row plus shared column lookup
// - result_set: one result table
// - query_result: all tables of one command, plus typed views
// - json: JSON views and file persistence

pub mod json;
pub mod query_result;
pub mod result_set;
pub mod row;

pub use json::to_json_string;
pub use query_result::QueryResult;
pub use result_set::ResultSet;
pub use row::CustomDbRow;
