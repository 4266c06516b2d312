use thiserror::Error;

pub type FsmResult<T> = Result<T, FsmError>;

/// Error taxonomy shared by the engine, its collaborators and the transport.
///
/// Handlers and stores classify their own failures by picking a variant; the
/// engine passes them through unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsmError {
    /// The request itself is invalid for the journey (wrong event, wrong start).
    #[error("bypass error: {0}")]
    Bypass(String),

    #[error("journey not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Configuration or data-integrity defect, never the caller's fault.
    #[error("internal system error: {0}")]
    Internal(String),

    /// A downstream system the handler relies on failed.
    #[error("dependency system error: {0}")]
    Dependency(String),
}

impl FsmError {
    pub fn bypass(msg: impl Into<String>) -> Self {
        Self::Bypass(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::Dependency(msg.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bypass(_) => "FSM_BYPASS_ERROR",
            Self::NotFound(_) => "FSM_JOURNEY_NOT_FOUND",
            Self::BadRequest(_) => "FSM_BAD_REQUEST_ERROR",
            Self::Internal(_) => "FSM_INTERNAL_SYSTEM_ERROR",
            Self::Dependency(_) => "FSM_DEPENDENCY_SYSTEM_ERROR",
        }
    }

    /// HTTP status a transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Bypass(_) => 403,
            Self::NotFound(_) => 404,
            Self::BadRequest(_) => 400,
            Self::Internal(_) => 500,
            Self::Dependency(_) => 424,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Bypass(m)
            | Self::NotFound(m)
            | Self::BadRequest(m)
            | Self::Internal(m)
            | Self::Dependency(m) => m,
        }
    }

    /// `true` for errors caused by the request rather than by the system.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, Self::Bypass(_) | Self::NotFound(_) | Self::BadRequest(_))
    }
}

impl From<anyhow::Error> for FsmError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for FsmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_status() {
        let err = FsmError::bypass("invalid event Next for state Init");
        assert_eq!(err.code(), "FSM_BYPASS_ERROR");
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "invalid event Next for state Init");
        assert!(err.is_caller_fault());

        let err = FsmError::internal("cannot find next state");
        assert_eq!(err.code(), "FSM_INTERNAL_SYSTEM_ERROR");
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_caller_fault());

        assert_eq!(FsmError::not_found("journey not found").status_code(), 404);
        assert_eq!(FsmError::dependency("kyc down").status_code(), 424);
        assert_eq!(FsmError::bad_request("missing event").status_code(), 400);
    }

    #[test]
    fn test_anyhow_maps_to_internal() {
        let err: FsmError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err, FsmError::Internal("connection refused".to_string()));
    }

    #[test]
    fn test_display() {
        let err = FsmError::bypass("invalid journey error: wrong event");
        assert_eq!(
            err.to_string(),
            "bypass error: invalid journey error: wrong event"
        );
    }
}
