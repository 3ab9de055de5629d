use async_trait::async_trait;

use super::CommandRequest;
use crate::error::SqlMapperError;
use crate::results::QueryResult;
use crate::types::DatabaseType;

/// Anything that can run a command and hand back every result table it produced.
///
/// Backends implement this; `SqlClient` layers timeouts and cancellation on top.
#[async_trait]
pub trait TabularSource: Send + Sync {
    /// Run `request` to completion and collect all of its result tables.
    ///
    /// # Errors
    /// Returns the backend's error when the command fails.
    async fn execute(&self, request: &CommandRequest) -> Result<QueryResult, SqlMapperError>;

    /// Ask an in-flight command to stop. Called when a timeout or cancellation fires.
    fn interrupt(&self) {}

    fn database_type(&self) -> Option<DatabaseType> {
        None
    }
}
