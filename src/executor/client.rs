use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::dispatch::run_command;
use super::{CommandRequest, TabularSource};
use crate::conversion::{FromRowValue, ToRowValue};
use crate::error::SqlMapperError;
use crate::mapping::Entity;
use crate::params::SqlParam;
use crate::results::{CustomDbRow, QueryResult, ResultSet};
use crate::types::DatabaseType;

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Options shared by every command a client runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub default_timeout: Duration,
}

impl ClientOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Zero keeps the built-in default.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.default_timeout = timeout;
        }
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap-to-clone handle for running commands against one tabular source.
///
/// # Examples
/// ```rust,no_run
/// use sql_mapper::prelude::*;
///
/// # async fn demo() -> Result<(), SqlMapperError> {
/// let client = SqliteOptionsBuilder::new("file::memory:".to_string()).build().await?;
/// client.query("CREATE TABLE t (id INTEGER, name TEXT)").execute().await?;
/// let count: Option<i64> = client
///     .query("SELECT COUNT(*) FROM t WHERE name = @name")
///     .param("name", "erick")
///     .scalar()
///     .await?;
/// # let _ = count;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqlClient {
    source: Arc<dyn TabularSource>,
    options: ClientOptions,
}

impl std::fmt::Debug for SqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlClient")
            .field("database_type", &self.source.database_type())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SqlClient {
    pub fn new(source: impl TabularSource + 'static, options: ClientOptions) -> Self {
        Self::from_source(Arc::new(source), options)
    }

    #[must_use]
    pub fn from_source(source: Arc<dyn TabularSource>, options: ClientOptions) -> Self {
        Self { source, options }
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    #[must_use]
    pub fn database_type(&self) -> Option<DatabaseType> {
        self.source.database_type()
    }

    /// Start a text command.
    pub fn query(&self, sql: impl Into<String>) -> CommandBuilder<'_> {
        CommandBuilder {
            client: self,
            request: CommandRequest::text(sql),
        }
    }

    /// Start a stored procedure call.
    pub fn stored_procedure(&self, name: impl Into<String>) -> CommandBuilder<'_> {
        CommandBuilder {
            client: self,
            request: CommandRequest::stored_procedure(name),
        }
    }

    /// Run a prepared request.
    ///
    /// # Errors
    /// See [`CommandBuilder::execute`].
    pub async fn execute(&self, request: &CommandRequest) -> Result<QueryResult, SqlMapperError> {
        run_command(self.source.as_ref(), request, self.options.default_timeout).await
    }
}

/// Fluent builder for a single command.
#[must_use = "a command does nothing until one of its terminal methods is awaited"]
pub struct CommandBuilder<'c> {
    client: &'c SqlClient,
    request: CommandRequest,
}

impl CommandBuilder<'_> {
    /// Bind a named parameter.
    pub fn param(mut self, name: &str, value: impl ToRowValue) -> Self {
        self.request.params.push(SqlParam::new(name, value));
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = SqlParam>) -> Self {
        self.request.params.extend(params);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    /// Abandon the command when `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.request.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn into_request(self) -> CommandRequest {
        self.request
    }

    /// Run the command and return every result table.
    ///
    /// # Errors
    /// Returns `ConfigError` for blank text, `Timeout`/`Cancelled` when the command
    /// is abandoned, and backend errors as reported.
    pub async fn execute(self) -> Result<QueryResult, SqlMapperError> {
        self.client.execute(&self.request).await
    }

    /// The first table, or an empty one.
    ///
    /// # Errors
    /// See [`CommandBuilder::execute`].
    pub async fn as_table(self) -> Result<ResultSet, SqlMapperError> {
        Ok(self.execute().await?.into_iter().next().unwrap_or_default())
    }

    /// # Errors
    /// See [`CommandBuilder::execute`].
    pub async fn first_row(self) -> Result<Option<CustomDbRow>, SqlMapperError> {
        Ok(self.as_table().await?.results.into_iter().next())
    }

    /// # Errors
    /// See [`CommandBuilder::execute`] and [`QueryResult::scalar`].
    pub async fn scalar<V: FromRowValue>(self) -> Result<Option<V>, SqlMapperError> {
        self.execute().await?.scalar()
    }

    /// # Errors
    /// See [`CommandBuilder::execute`] and [`QueryResult::to_list`].
    pub async fn to_list<T: Entity>(self) -> Result<Vec<T>, SqlMapperError> {
        self.execute().await?.to_list()
    }

    /// # Errors
    /// See [`CommandBuilder::execute`] and [`QueryResult::first_or_default`].
    pub async fn first<T: Entity>(self) -> Result<Option<T>, SqlMapperError> {
        self.execute().await?.first_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StaticSource, table};
    use crate::types::RowValues;

    fn client_with(source: StaticSource) -> SqlClient {
        SqlClient::new(source, ClientOptions::default())
    }

    #[test]
    fn options_ignore_zero_timeout() {
        let opts = ClientOptions::new().with_default_timeout(Duration::ZERO);
        assert_eq!(opts.default_timeout, DEFAULT_COMMAND_TIMEOUT);
    }

    #[tokio::test]
    async fn builder_forwards_params_to_the_source() {
        let source = StaticSource::new(vec![table(&["n"], vec![vec![RowValues::Int(7)]])]);
        let seen = source.requests();
        let client = client_with(source);

        let value: Option<i64> = client
            .stored_procedure("CountThings")
            .param("Kind", "a")
            .scalar()
            .await
            .unwrap();
        assert_eq!(value, Some(7));

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, "CountThings");
        assert_eq!(requests[0].params[0].name, "@Kind");
    }

    #[tokio::test]
    async fn slow_commands_time_out_and_interrupt() {
        let source = StaticSource::new(vec![]).with_delay(Duration::from_secs(5));
        let interrupted = source.interrupted();
        let client = client_with(source);

        let err = client
            .query("SELECT 1")
            .timeout(Duration::from_millis(20))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, SqlMapperError::Timeout(_)));
        assert!(interrupted.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_stops_the_command() {
        let source = StaticSource::new(vec![]).with_delay(Duration::from_secs(5));
        let client = client_with(source);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = client.query("SELECT 1").cancel_on(token).execute().await.unwrap_err();
        assert!(matches!(err, SqlMapperError::Cancelled));
    }

    #[tokio::test]
    async fn empty_results_give_empty_views() {
        let client = client_with(StaticSource::new(vec![]));
        assert!(client.query("DELETE FROM t").as_table().await.unwrap().is_empty());
        assert!(client.query("DELETE FROM t").first_row().await.unwrap().is_none());
        assert!(matches!(
            client.query("").execute().await,
            Err(SqlMapperError::ConfigError(_))
        ));
    }
}
