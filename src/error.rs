use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Harness error: {0}")]
    Harness(#[from] HarnessError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures reported by the host media platform.
///
/// These are passed through untouched from the host to whoever awaited the
/// operation, so the variant and message a caller sees are exactly what the
/// host produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Permission denied: {details}")]
    PermissionDenied { details: String },

    #[error("Requested device not found: {details}")]
    NotFound { details: String },

    #[error("Constraint '{constraint}' cannot be satisfied: {details}")]
    Overconstrained { constraint: String, details: String },

    #[error("Invalid state: {details}")]
    InvalidState { details: String },

    #[error("Operation not supported: {details}")]
    NotSupported { details: String },

    #[error("Host operation failed: {details}")]
    Failed { details: String },
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Encoding produced an empty {mime_type} image")]
    EmptyEncode { mime_type: String },

    #[error("Failed to decode captured image: {details}")]
    Decode { details: String },

    #[error("Failed to encode image: {details}")]
    Encode { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("Recording can only start from idle")]
    NotIdle,

    #[error("No recording in progress")]
    NotRecording,

    #[error("No camera session is attached to the recorder")]
    NoSession,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Invalid value '{value}' for {element}: {details}")]
    InvalidValue {
        element: String,
        value: String,
        details: String,
    },

    #[error("Element has no value: {element}")]
    MissingValue { element: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error("{step}{first_error}")]
    StepFailed { step: String, first_error: String },
}

impl WebcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl PlatformError {
    pub fn failed<S: Into<String>>(details: S) -> Self {
        Self::Failed {
            details: details.into(),
        }
    }

    /// Short DOMException-style name of the failure.
    pub fn name(&self) -> &'static str {
        match self {
            PlatformError::PermissionDenied { .. } => "NotAllowedError",
            PlatformError::NotFound { .. } => "NotFoundError",
            PlatformError::Overconstrained { .. } => "OverconstrainedError",
            PlatformError::InvalidState { .. } => "InvalidStateError",
            PlatformError::NotSupported { .. } => "NotSupportedError",
            PlatformError::Failed { .. } => "UnknownError",
        }
    }
}

pub type Result<T> = std::result::Result<T, WebcamError>;
