use thiserror::Error;

pub const BUFFER_EMPTY: &str = "File buffer is empty";
pub const UPLOAD_FAILED: &str = "Failed to upload file to media provider";
pub const NO_SECURE_URL: &str = "No secure URL found in provider response";
pub const DELETE_FAILED: &str = "Failed to delete media from provider";
pub const RESOLVE_FAILED: &str = "Failed to resolve public URL";

/// Status reported for a bulk-delete entry that came back absent or blank.
pub const NOT_FOUND_STATUS: &str = "not_found";

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors surfaced by the media gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("{}", BUFFER_EMPTY)]
    BufferEmpty,

    #[error("{reason}")]
    UploadFailed { reason: String },

    #[error("{}", NO_SECURE_URL)]
    NoSecureUrl,

    #[error("{}", DELETE_FAILED)]
    DeleteFailed {
        public_id: String,
        cause: FailureCause,
    },

    #[error("{}", RESOLVE_FAILED)]
    ResolveFailed {
        public_id: String,
        cause: FailureCause,
    },

    #[error("Unknown media provider: {name}")]
    UnknownProvider { name: String },

    #[error("Invalid media configuration: {message}")]
    Config { message: String },
}

/// Why a delete or resolve call was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// Blank identifier, never sent to the provider
    EmptyId,
    /// Provider does not know the identifier
    NotFound,
    /// Provider answered with a status other than a success status
    Status(String),
    /// Provider call failed or returned unusable data
    Transport(String),
}

impl FailureCause {
    /// Status reported for this cause in a batch failure entry.
    ///
    /// Matches what a bulk delete reports for the same provider answer; an
    /// empty string means the caller should substitute its canonical message.
    pub fn status(&self) -> String {
        match self {
            FailureCause::EmptyId | FailureCause::NotFound => NOT_FOUND_STATUS.to_string(),
            FailureCause::Status(status) => status.clone(),
            FailureCause::Transport(message) => message.clone(),
        }
    }

    pub fn kind(&self) -> MediaErrorKind {
        match self {
            FailureCause::EmptyId => MediaErrorKind::InputInvalid,
            FailureCause::NotFound => MediaErrorKind::NotFound,
            FailureCause::Status(_) | FailureCause::Transport(_) => MediaErrorKind::TransportFailed,
        }
    }
}

/// Coarse classification of a [`MediaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaErrorKind {
    /// Empty payload or identifier, rejected before any provider call
    InputInvalid,
    /// Provider unreachable, rejected the request, or answered with unusable data
    TransportFailed,
    /// Resource absent at delete/resolve time
    NotFound,
    /// Startup wiring problem
    Configuration,
}

impl MediaErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            MediaErrorKind::InputInvalid => 400,
            MediaErrorKind::NotFound => 404,
            MediaErrorKind::Configuration => 500,
            MediaErrorKind::TransportFailed => 502,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaErrorKind::InputInvalid => "InputInvalid",
            MediaErrorKind::TransportFailed => "TransportFailed",
            MediaErrorKind::NotFound => "NotFound",
            MediaErrorKind::Configuration => "Configuration",
        }
    }
}

impl MediaError {
    /// Create an upload failure, falling back to [`UPLOAD_FAILED`] when the
    /// provider gave no usable message
    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: non_blank_or(reason.into(), UPLOAD_FAILED),
        }
    }

    /// Create a delete failure for a public id
    pub fn delete_failed<S: Into<String>>(public_id: S, cause: FailureCause) -> Self {
        Self::DeleteFailed {
            public_id: public_id.into(),
            cause,
        }
    }

    /// Create a resolve failure for a public id
    pub fn resolve_failed<S: Into<String>>(public_id: S, cause: FailureCause) -> Self {
        Self::ResolveFailed {
            public_id: public_id.into(),
            cause,
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Text recorded for this error in a batch failure entry
    pub fn failure_status(&self) -> String {
        match self {
            MediaError::DeleteFailed { cause, .. } | MediaError::ResolveFailed { cause, .. } => {
                cause.status()
            }
            other => other.to_string(),
        }
    }

    pub fn kind(&self) -> MediaErrorKind {
        match self {
            MediaError::BufferEmpty => MediaErrorKind::InputInvalid,
            MediaError::UploadFailed { .. } | MediaError::NoSecureUrl => {
                MediaErrorKind::TransportFailed
            }
            MediaError::DeleteFailed { cause, .. } | MediaError::ResolveFailed { cause, .. } => {
                cause.kind()
            }
            MediaError::UnknownProvider { .. } | MediaError::Config { .. } => {
                MediaErrorKind::Configuration
            }
        }
    }
}

/// Errors reported by a remote media API binding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Transport(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Operation not supported by this provider")]
    Unsupported,
}

impl ApiError {
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected(message.into())
    }
}

/// Use `message` unless it is blank, in which case use `fallback`
pub(crate) fn non_blank_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
