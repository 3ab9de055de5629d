//! Builders and fakes for exercising the mapper without a database.

mod static_source;
pub mod test_helpers;

pub use static_source::StaticSource;
pub use test_helpers::{create_test_row, table};
