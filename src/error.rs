use thiserror::Error;

/// Faults raised by the registration coordinator.
///
/// Every variant renders to a non-empty message that names the script id
/// and the step that failed, since the message is what the UI shows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    #[error("User scripts are not available. {guidance}")]
    CapabilityUnavailable { guidance: String },

    #[error("Failed to clear previous registration for script '{id}': {message}")]
    UnregisterPrecheckFailed { id: String, message: String },

    #[error("Failed to register script '{id}': {message}")]
    RegisterFailed { id: String, message: String },

    #[error("Failed to unregister script '{id}': {message}")]
    UnregisterFailed { id: String, message: String },

    #[error("Failed to list registered scripts: {0}")]
    ListFailed(String),

    #[error("Failed to update styles for script '{id}': {message}")]
    StyleFailed { id: String, message: String },
}

impl RegistrationError {
    /// Enablement guidance, if this fault came from a disabled capability.
    pub fn guidance(&self) -> Option<&str> {
        match self {
            RegistrationError::CapabilityUnavailable { guidance } => Some(guidance),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PagesmithError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A complete frame whose payload is not JSON. The stream stays in sync.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PagesmithError>;
