use crate::ids::SessionId;

/// Errors raised by a run engine, either when starting a run or as the
/// outcome carried on its completion signal.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RunError {
    // Cancellation class
    #[error("request cancelled")]
    Cancelled,
    #[error("run context cancelled")]
    ContextCancelled,

    // Rejected at start
    #[error("session {0} is busy")]
    SessionBusy(SessionId),
    #[error("no run slot available")]
    Unavailable,

    #[error("run failed: {0}")]
    Failed(String),
}

impl RunError {
    /// Explicit cancellation or a cancelled run context. Everything else is a
    /// generic failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::ContextCancelled)
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::ContextCancelled => "context_cancelled",
            Self::SessionBusy(_) => "session_busy",
            Self::Unavailable => "unavailable",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session store error: {0}")]
    Storage(String),
}

/// Errors a prompt turn can surface to its caller. Anything that happens once
/// the relay loop is running resolves to a stop reason instead.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("failed to start run: {0}")]
    RunStartFailed(#[source] RunError),

    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for RelayError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(id) => Self::SessionNotFound(id),
            other => Self::Directory(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_classification() {
        assert!(RunError::Cancelled.is_cancellation());
        assert!(RunError::ContextCancelled.is_cancellation());
        assert!(!RunError::Failed("boom".into()).is_cancellation());
        assert!(!RunError::SessionBusy(SessionId::new()).is_cancellation());
        assert!(!RunError::Unavailable.is_cancellation());
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(RunError::Cancelled.error_kind(), "cancelled");
        assert_eq!(RunError::SessionBusy(SessionId::new()).error_kind(), "session_busy");
        assert_eq!(RunError::Failed("x".into()).error_kind(), "failed");
    }

    #[test]
    fn directory_not_found_maps_to_session_not_found() {
        let sid = SessionId::from_raw("sess_missing");
        let err: RelayError = DirectoryError::NotFound(sid.clone()).into();
        assert!(matches!(err, RelayError::SessionNotFound(ref id) if *id == sid));
        assert_eq!(err.to_string(), "session sess_missing not found");
    }

    #[test]
    fn storage_errors_stay_distinct() {
        let err: RelayError = DirectoryError::Storage("disk full".into()).into();
        assert!(matches!(err, RelayError::Directory(_)));
        assert_eq!(err.to_string(), "session store error: disk full");
    }

    #[test]
    fn run_start_failure_keeps_source() {
        let err = RelayError::RunStartFailed(RunError::SessionBusy(SessionId::from_raw("s1")));
        assert_eq!(err.to_string(), "failed to start run: session s1 is busy");
        assert!(std::error::Error::source(&err).is_some());
    }
}
