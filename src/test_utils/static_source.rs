use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SqlMapperError;
use crate::executor::{CommandRequest, TabularSource};
use crate::results::{QueryResult, ResultSet};

/// A source that answers every command with the same tables.
///
/// Records each request it receives and whether it was interrupted.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tables: Vec<ResultSet>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<CommandRequest>>>,
    interrupted: Arc<AtomicBool>,
}

impl StaticSource {
    #[must_use]
    pub fn new(tables: Vec<ResultSet>) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }

    /// Sleep this long before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests seen so far.
    #[must_use]
    pub fn requests(&self) -> Arc<Mutex<Vec<CommandRequest>>> {
        Arc::clone(&self.requests)
    }

    #[must_use]
    pub fn interrupted(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }
}

#[async_trait]
impl TabularSource for StaticSource {
    async fn execute(&self, request: &CommandRequest) -> Result<QueryResult, SqlMapperError> {
        match self.requests.lock() {
            Ok(mut seen) => seen.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(QueryResult::new(self.tables.clone()))
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}
