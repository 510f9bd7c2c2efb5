use thiserror::Error;

pub const MODEL_NOT_LOADED_MESSAGE: &str = "System Error: AI model not loaded.";
pub const UPSTREAM_FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while contacting the assistant. Please try again.";
pub const BAD_REQUEST_MESSAGE: &str = "Please send a message so I can help you.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("no language model is configured")]
    ModelNotLoaded,
    #[error("invalid chat request: {0}")]
    InvalidRequest(String),
    #[error("model call failed: {0}")]
    Integration(String),
    #[error("model call timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("model not loaded")]
    ModelNotLoaded { correlation_id: String },
    #[error("upstream failure: {message}")]
    Upstream { message: String, correlation_id: String },
    #[error("upstream timeout: {message}")]
    Timeout { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Fixed text shown to the end user; internal detail never leaks through it.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => BAD_REQUEST_MESSAGE,
            Self::ModelNotLoaded { .. } => MODEL_NOT_LOADED_MESSAGE,
            Self::Upstream { .. } | Self::Timeout { .. } => UPSTREAM_FAILURE_MESSAGE,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::ModelNotLoaded { .. } => 503,
            Self::Upstream { .. } => 502,
            Self::Timeout { .. } => 504,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ModelNotLoaded { correlation_id }
            | Self::Upstream { correlation_id, .. }
            | Self::Timeout { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ModelNotLoaded { correlation_id: id }
            | InterfaceError::Upstream { correlation_id: id, .. }
            | InterfaceError::Timeout { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::ModelNotLoaded => Self::ModelNotLoaded { correlation_id },
            ApplicationError::InvalidRequest(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::Integration(message) => Self::Upstream { message, correlation_id },
            error @ ApplicationError::Timeout { .. } => {
                Self::Timeout { message: error.to_string(), correlation_id }
            }
        }
    }
}
