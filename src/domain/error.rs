use thiserror::Error;

/// Classification of backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Filesystem or object store I/O failed
    Io,
    /// The operation did not finish within the configured I/O timeout
    Timeout,
    /// An artifact could not be encoded or decoded
    Serialization,
    /// A stored estimator could not be re-fitted during retrain
    Fit,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "io"),
            Self::Timeout => write!(f, "timeout"),
            Self::Serialization => write!(f, "serialization"),
            Self::Fit => write!(f, "fit"),
        }
    }
}

/// Core domain errors shared by both transports
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Unsupported model type: {model_type}")]
    UnsupportedType { model_type: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Backend error ({kind}): {message}")]
    Backend {
        kind: BackendErrorKind,
        message: String,
    },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn unsupported_type(model_type: impl Into<String>) -> Self {
        Self::UnsupportedType {
            model_type: model_type.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn backend(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self::Backend {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::backend(BackendErrorKind::Io, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::backend(BackendErrorKind::Timeout, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::backend(BackendErrorKind::Serialization, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::backend(BackendErrorKind::Fit, message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short machine-readable name of the error class
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::InvalidParams { .. } => "invalid_params",
            Self::Backend { .. } => "backend_error",
        }
    }
}
