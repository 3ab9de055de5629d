use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SqlMapperError;
use crate::params::SqlParam;
use crate::types::CommandKind;

/// One command to run against a tabular source.
#[derive(Debug, Clone, Default)]
pub struct CommandRequest {
    /// SQL text, or the procedure name for `CommandKind::StoredProcedure`.
    pub text: String,
    pub kind: CommandKind,
    pub params: Vec<SqlParam>,
    /// Overrides the client default; zero means "use the default".
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl CommandRequest {
    #[must_use]
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            text: sql.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn stored_procedure(name: impl Into<String>) -> Self {
        Self {
            text: name.into(),
            kind: CommandKind::StoredProcedure,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: SqlParam) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = SqlParam>) -> Self {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// # Errors
    /// Returns `ConfigError` when the command text is blank.
    pub fn validate(&self) -> Result<(), SqlMapperError> {
        if self.text.trim().is_empty() {
            return Err(SqlMapperError::ConfigError(
                "command text cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The timeout to enforce, falling back to `default` when unset or zero.
    #[must_use]
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.filter(|t| !t.is_zero()).unwrap_or(default)
    }

    /// Look up a parameter by name, with or without its marker.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&SqlParam> {
        let wanted = name.trim_start_matches(['@', ':', '$']);
        self.params
            .iter()
            .find(|p| p.bare_name().eq_ignore_ascii_case(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(matches!(
            CommandRequest::text("  ").validate(),
            Err(SqlMapperError::ConfigError(_))
        ));
        assert!(CommandRequest::stored_procedure("GetUsers").validate().is_ok());
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let default = Duration::from_secs(30);
        let req = CommandRequest::text("SELECT 1");
        assert_eq!(req.effective_timeout(default), default);
        let req = req.with_timeout(Duration::ZERO);
        assert_eq!(req.effective_timeout(default), default);
        let req = req.with_timeout(Duration::from_millis(5));
        assert_eq!(req.effective_timeout(default), Duration::from_millis(5));
    }

    #[test]
    fn params_are_found_by_bare_name() {
        let req = CommandRequest::text("SELECT @Id").with_param(SqlParam::int("Id", 3));
        assert!(req.param("@id").is_some());
        assert!(req.param(":ID").is_some());
        assert!(req.param("other").is_none());
    }
}
