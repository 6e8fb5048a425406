//! Domain errors surfaced by the access services.

use visitgate_core::db::DatabaseError;

/// Outcome of a refused or failed access operation.
///
/// Everything except [`AccessError::Storage`] describes a request the system
/// understood and rejected; `Storage` means the system itself is unavailable.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access window is closed")]
    WindowClosed,

    #[error("Access has no uses left")]
    UsageExhausted,

    #[error("Visitor is blacklisted")]
    Blacklisted,

    #[error("Visitor is not on the invitation list")]
    NotInvited,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),
}

impl AccessError {
    /// Stable machine-readable name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::WindowClosed => "window_closed",
            Self::UsageExhausted => "usage_exhausted",
            Self::Blacklisted => "blacklisted",
            Self::NotInvited => "not_invited",
            Self::InvalidSchedule(_) => "invalid_schedule",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Conflict(_) => "conflict",
            Self::InvalidInput(_) => "invalid_input",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<DatabaseError> for AccessError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Conflict(what) => Self::Conflict(what),
            other => Self::Storage(other),
        }
    }
}

impl From<visitgate_core::Error> for AccessError {
    fn from(e: visitgate_core::Error) -> Self {
        match e {
            visitgate_core::Error::InvalidSchedule(msg) => Self::InvalidSchedule(msg),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_stays_a_domain_error() {
        let err: AccessError = DatabaseError::NotFound("Access a1".into()).into();
        assert_eq!(err.kind(), "not_found");

        let err: AccessError = DatabaseError::Connection("refused".into()).into();
        assert_eq!(err.kind(), "storage");
    }

    #[test]
    fn schedule_errors_keep_their_kind() {
        let err: AccessError =
            visitgate_core::Error::InvalidSchedule("ends before it starts".into()).into();
        assert!(matches!(err, AccessError::InvalidSchedule(_)));
    }
}
