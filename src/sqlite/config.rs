use std::time::Duration;

use crate::error::SqlMapperError;
use crate::executor::{ClientOptions, SqlClient};

use super::connection::SqliteSource;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// File path, `:memory:` or a `file:` URI.
    pub db_path: String,
    pub default_timeout: Duration,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            default_timeout: ClientOptions::default().default_timeout,
        }
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

impl From<String> for SqliteOptions {
    fn from(db_path: String) -> Self {
        Self::new(db_path)
    }
}

impl From<&str> for SqliteOptions {
    fn from(db_path: &str) -> Self {
        Self::new(db_path.to_string())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open the database and wrap it in a client.
    ///
    /// # Errors
    ///
    /// Returns `SqlMapperError` if the path is empty or the connection smoke test fails.
    pub async fn build(self) -> Result<SqlClient, SqlMapperError> {
        SqlClient::new_sqlite(self.finish()).await
    }
}

impl SqlClient {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open a `SQLite` database.
    ///
    /// # Errors
    /// Returns `ConfigError` for an empty path and `ConnectionError` if the database
    /// cannot be opened.
    pub async fn new_sqlite(opts: impl Into<SqliteOptions>) -> Result<Self, SqlMapperError> {
        let opts = opts.into();
        if opts.db_path.trim().is_empty() {
            return Err(SqlMapperError::ConfigError(
                "SQLite database path cannot be empty".to_string(),
            ));
        }
        let source = SqliteSource::open(&opts.db_path).await?;
        let options = ClientOptions::new().with_default_timeout(opts.default_timeout);
        Ok(SqlClient::new(source, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_timeout() {
        let opts = SqlClient::sqlite_builder("db.sqlite".into())
            .timeout(Duration::from_secs(5))
            .finish();
        assert_eq!(opts.db_path, "db.sqlite");
        assert_eq!(opts.default_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn empty_path_is_a_config_error() {
        let err = SqlClient::new_sqlite(SqliteOptions::new(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlMapperError::ConfigError(_)));
    }

    #[tokio::test]
    async fn paths_convert_into_options() {
        let client = SqlClient::new_sqlite(":memory:").await.unwrap();
        assert_eq!(client.options().default_timeout, Duration::from_secs(30));
    }
}
