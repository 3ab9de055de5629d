use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

use super::config::MssqlOptions;
use super::params::{procedure_command, text_command};
use super::query::build_query_result;
use crate::error::SqlMapperError;
use crate::executor::{CommandRequest, TabularSource};
use crate::results::QueryResult;
use crate::types::{CommandKind, DatabaseType};

/// Type alias for a SQL Server client over tokio TCP.
pub type MssqlClient = Client<Compat<TcpStream>>;

fn build_tiberius_config(opts: &MssqlOptions) -> Config {
    let mut config = Config::new();
    config.host(&opts.server);
    config.database(&opts.database);
    config.port(opts.port_or_default());
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    if let Some(instance) = &opts.instance_name {
        config.instance_name(instance);
    }
    if opts.trust_cert {
        config.trust_cert();
    }
    config
}

async fn open_tcp(config: &Config, named_instance: bool) -> Result<TcpStream, SqlMapperError> {
    let tcp = if named_instance {
        TcpStream::connect_named(config).await.map_err(|e| {
            SqlMapperError::ConnectionError(format!("SQL Browser lookup failed: {e}"))
        })?
    } else {
        TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| SqlMapperError::ConnectionError(format!("TCP connection error: {e}")))?
    };
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

/// Open one SQL Server connection.
///
/// Follows a single routing redirect, as Azure SQL gateways send.
///
/// # Errors
/// Returns `SqlMapperError::ConnectionError` if the MSSQL connection fails.
pub async fn create_mssql_client(opts: &MssqlOptions) -> Result<MssqlClient, SqlMapperError> {
    opts.validate()?;
    let mut config = build_tiberius_config(opts);
    let named = opts.instance_name.is_some();
    let tcp = open_tcp(&config, named).await?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!(%host, port, "SQL Server redirected the connection");
            config.host(&host);
            config.port(port);
            let tcp = open_tcp(&config, false).await?;
            Client::connect(config, tcp.compat_write()).await.map_err(|e| {
                SqlMapperError::ConnectionError(format!("SQL Server connection error: {e}"))
            })
        }
        Err(e) => Err(SqlMapperError::ConnectionError(format!(
            "SQL Server connection error: {e}"
        ))),
    }
}

/// One SQL Server connection; commands run one at a time.
///
/// An interrupted command leaves the wire protocol mid-stream, so the connection is
/// dropped and reopened before the next command.
pub struct MssqlSource {
    client: Mutex<Option<MssqlClient>>,
    options: MssqlOptions,
    stale: AtomicBool,
}

impl MssqlSource {
    /// Connect eagerly so bad credentials surface at construction.
    ///
    /// # Errors
    /// See [`create_mssql_client`].
    pub async fn connect(options: MssqlOptions) -> Result<Self, SqlMapperError> {
        let client = create_mssql_client(&options).await?;
        debug!(server = %options.server, database = %options.database, "connected to SQL Server");
        Ok(Self {
            client: Mutex::new(Some(client)),
            options,
            stale: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn options(&self) -> &MssqlOptions {
        &self.options
    }
}

impl std::fmt::Debug for MssqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlSource")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TabularSource for MssqlSource {
    async fn execute(&self, request: &CommandRequest) -> Result<QueryResult, SqlMapperError> {
        let command = match request.kind {
            CommandKind::Text => text_command(&request.text, &request.params)?,
            CommandKind::StoredProcedure => procedure_command(&request.text, &request.params)?,
        };

        let mut guard = self.client.lock().await;
        if self.stale.swap(false, Ordering::SeqCst) && guard.take().is_some() {
            debug!("dropping interrupted SQL Server connection");
        }
        if guard.is_none() {
            *guard = Some(create_mssql_client(&self.options).await?);
        }
        let Some(client) = guard.as_mut() else {
            return Err(SqlMapperError::ConnectionError(
                "SQL Server connection unavailable".to_string(),
            ));
        };

        let outcome = build_query_result(client, &command, &request.params).await;
        if let Err(SqlMapperError::MssqlError(e @ tiberius::error::Error::Io { .. })) = &outcome {
            warn!(error = %e, "SQL Server command failed; reconnecting on next use");
            *guard = None;
        }
        outcome
    }

    fn interrupt(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    fn database_type(&self) -> Option<DatabaseType> {
        Some(DatabaseType::Mssql)
    }
}
