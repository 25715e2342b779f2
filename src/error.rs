use thiserror::Error;

/// Classified outcome reasons for a failed guild-leave operation.
///
/// Every variant renders to the human-readable reason string recorded in the
/// leave ledger and shown in the final report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaveError {
    #[error("401 Unauthorized - Invalid token")]
    Unauthorized,

    #[error("403 Forbidden - No permission")]
    Forbidden,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Response error: {0}")]
    Response(String),

    #[error("Unknown error: {0}")]
    Unexpected(String),

    #[error("Failed after {0} attempts")]
    Exhausted(u32),
}

impl LeaveError {
    /// True when another attempt against the same guild could succeed.
    /// Unauthorized and forbidden responses never clear up on retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaveError::Unauthorized | LeaveError::Forbidden)
    }
}
