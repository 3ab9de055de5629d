use std::time::Duration;

use tracing::debug;

use super::{CommandRequest, TabularSource};
use crate::error::SqlMapperError;
use crate::results::QueryResult;

/// Run one request against `source`, enforcing its timeout and cancellation token.
///
/// When either fires the source is interrupted and the pending work is dropped.
///
/// # Errors
/// Returns `ConfigError` for a blank command, `Timeout` or `Cancelled` when the command
/// did not finish, and otherwise whatever the source reports.
pub(crate) async fn run_command(
    source: &dyn TabularSource,
    request: &CommandRequest,
    default_timeout: Duration,
) -> Result<QueryResult, SqlMapperError> {
    request.validate()?;
    let timeout = request.effective_timeout(default_timeout);
    let cancel = request.cancel.clone().unwrap_or_default();

    debug!(
        kind = ?request.kind,
        text = %request.text,
        params = request.params.len(),
        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        "dispatching command"
    );

    if cancel.is_cancelled() {
        return Err(SqlMapperError::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            source.interrupt();
            Err(SqlMapperError::Cancelled)
        }
        outcome = tokio::time::timeout(timeout, source.execute(request)) => match outcome {
            Ok(result) => result,
            Err(_elapsed) => {
                source.interrupt();
                Err(SqlMapperError::Timeout(timeout))
            }
        },
    }
}
