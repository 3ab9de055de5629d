use std::time::Duration;

use crate::error::SqlMapperError;
use crate::executor::{ClientOptions, SqlClient};

use super::client::MssqlSource;

/// Default SQL Server port.
pub const DEFAULT_MSSQL_PORT: u16 = 1433;

/// Options for connecting to SQL Server.
#[derive(Clone)]
pub struct MssqlOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    /// Accept the server certificate without validation.
    pub trust_cert: bool,
    pub default_timeout: Duration,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            server,
            database,
            user,
            password,
            port: None,
            instance_name: None,
            trust_cert: true,
            default_timeout: ClientOptions::default().default_timeout,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn with_trust_cert(mut self, trust_cert: bool) -> Self {
        self.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_MSSQL_PORT)
    }

    pub(crate) fn validate(&self) -> Result<(), SqlMapperError> {
        if self.server.trim().is_empty() {
            return Err(SqlMapperError::ConfigError("SQL Server host is empty".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(SqlMapperError::ConfigError("SQL Server database is empty".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MssqlOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlOptions")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("port", &self.port)
            .field("instance_name", &self.instance_name)
            .field("trust_cert", &self.trust_cert)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            opts: MssqlOptions::new(server, database, user, password),
        }
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.opts.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }

    /// Connect and wrap the connection in a `SqlClient`.
    ///
    /// # Errors
    ///
    /// Returns `SqlMapperError` if the options are invalid or the connection fails.
    pub async fn build(self) -> Result<SqlClient, SqlMapperError> {
        SqlClient::new_mssql(self.finish()).await
    }
}

impl SqlClient {
    #[must_use]
    pub fn mssql_builder(
        server: String,
        database: String,
        user: String,
        password: String,
    ) -> MssqlOptionsBuilder {
        MssqlOptionsBuilder::new(server, database, user, password)
    }

    /// Connect to SQL Server.
    ///
    /// # Errors
    /// Returns `ConfigError` for a blank host or database and `ConnectionError` if the
    /// server cannot be reached or rejects the login.
    pub async fn new_mssql(opts: MssqlOptions) -> Result<Self, SqlMapperError> {
        let client_options = ClientOptions::new().with_default_timeout(opts.default_timeout);
        let source = MssqlSource::connect(opts).await?;
        Ok(SqlClient::new(source, client_options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let opts = SqlClient::mssql_builder("db".into(), "app".into(), "sa".into(), "pw".into())
            .instance_name(Some("SQLEXPRESS".into()))
            .finish();
        assert_eq!(opts.port_or_default(), DEFAULT_MSSQL_PORT);
        assert!(opts.trust_cert);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn debug_hides_the_password() {
        let opts = MssqlOptions::new("db".into(), "app".into(), "sa".into(), "hunter2".into());
        assert!(!format!("{opts:?}").contains("hunter2"));
    }

    #[test]
    fn blank_host_is_rejected() {
        let opts = MssqlOptions::new(" ".into(), "app".into(), "sa".into(), "pw".into());
        assert!(matches!(opts.validate(), Err(SqlMapperError::ConfigError(_))));
    }
}
