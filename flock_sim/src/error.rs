use thiserror::Error;

/// Failure to load or accept a [`FlockConfig`](crate::config::FlockConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while building or mutating a [`Flock`](crate::flock::Flock).
#[derive(Debug, Error)]
pub enum FlockError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The body collaborator could not provide a physical representation.
    /// A flock cannot run with agents lacking a body, so construction aborts.
    #[error("failed to spawn body for agent {index}: {reason}")]
    Spawn { index: usize, reason: String },
    #[error("agent {index} out of range (flock has {len} agents)")]
    AgentOutOfRange { index: usize, len: usize },
}
