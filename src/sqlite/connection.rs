use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::InterruptHandle;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SqlMapperError;
use crate::executor::{CommandRequest, TabularSource};
use crate::results::QueryResult;
use crate::types::{CommandKind, DatabaseType};

use super::query::build_query_result;

pub(crate) type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// One `SQLite` connection; commands run one at a time on a blocking thread.
pub struct SqliteSource {
    conn: SharedSqliteConnection,
    interrupt: Arc<InterruptHandle>,
    db_path: String,
}

impl SqliteSource {
    /// Open `db_path` and check the connection answers.
    ///
    /// # Errors
    /// Returns `ConnectionError` if the database cannot be opened.
    pub async fn open(db_path: &str) -> Result<Self, SqlMapperError> {
        let path = db_path.to_string();
        let conn = tokio::task::spawn_blocking(move || -> Result<_, SqlMapperError> {
            let conn = rusqlite::Connection::open(&path).map_err(|e| {
                SqlMapperError::ConnectionError(format!("failed to open SQLite database {path}: {e}"))
            })?;
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!(db_path = %path, journal_mode = %mode, "opened SQLite database");
            Ok(conn)
        })
        .await
        .map_err(|e| {
            SqlMapperError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
        })??;

        let interrupt = Arc::new(conn.get_interrupt_handle());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            db_path: db_path.to_string(),
        })
    }

    /// Run `func` on the connection from a blocking thread.
    ///
    /// # Errors
    /// Returns whatever `func` returns, or `ExecutionError` if the blocking task panicked.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlMapperError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlMapperError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(Arc::clone(&self.conn), func).await
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

impl fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSource")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TabularSource for SqliteSource {
    async fn execute(&self, request: &CommandRequest) -> Result<QueryResult, SqlMapperError> {
        match request.kind {
            CommandKind::StoredProcedure => Err(SqlMapperError::Unimplemented(
                "SQLite has no stored procedures; send the statements as text".to_string(),
            )),
            CommandKind::Text => {
                let sql = request.text.clone();
                let params = request.params.clone();
                self.with_connection(move |conn| build_query_result(conn, &sql, &params))
                    .await
            }
        }
    }

    fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    fn database_type(&self) -> Option<DatabaseType> {
        Some(DatabaseType::Sqlite)
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlMapperError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlMapperError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlMapperError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}
