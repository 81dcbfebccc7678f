/// Domain-specific error types for the simulation engine.
/// Nothing here is retried: a simulation is a pure function of its
/// parameters plus fresh randomness, so every failure is final.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("simulation cancelled: {0}")]
    Cancelled(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::Internal(format!("simulation task failed: {e}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
