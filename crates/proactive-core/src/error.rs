use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProactiveError {
    #[error("not initialized: run 'proactive init'")]
    NotInitialized,

    #[error("engine is disabled: run 'proactive enable' first")]
    NotEnabled,

    #[error("no async runtime available to schedule cadence timers")]
    NoRuntime,

    #[error("invalid cadence '{cadence}': {reason}")]
    InvalidCadence { cadence: String, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown cadence '{0}': must be continuous, hourly, daily, or weekly")]
    UnknownCadence(String),

    #[error("{name} collaborator failed: {message}")]
    Collaborator { name: String, message: String },

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ProactiveError {
    /// Shorthand for a failure reported by an external collaborator.
    pub fn collaborator(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProactiveError>;
