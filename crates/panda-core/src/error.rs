//! Error types module
//!
//! All failures of the transcoding integration are unified under
//! [`TranscodeError`]. The variants follow the taxonomy used by callers:
//! provider failures, local preconditions that make a file untranscodable,
//! and ownership violations on cancel/retry.

use std::fmt::{Display, Formatter, Result as FmtResult};

use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to a caller.
pub trait ErrorMetadata {
    /// HTTP status code a host route should answer with
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PROVIDER_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    /// Provider-reported error payload, transport failure or DNS failure.
    #[error("Provider error: {}", display_provider(.code, .message))]
    Provider {
        code: Option<String>,
        message: String,
    },

    /// A local precondition prevents submission (no profiles, not a video,
    /// no download URI).
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// The encoding does not belong to a video associated with the media file.
    #[error("Encoding {encoding_id} is not associated with media file {media_file_id}")]
    Ownership {
        encoding_id: String,
        media_file_id: Uuid,
    },

    /// Local argument validation failed before any network call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Repository error: {message}")]
    Repository {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

fn display_provider(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("{} ({})", message, code),
        None => message.to_string(),
    }
}

/// Result type for transcoding operations
pub type TranscodeResult<T> = Result<T, TranscodeError>;

impl TranscodeError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        TranscodeError::Provider {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Provider failure without a provider error code (transport, DNS).
    pub fn transport(message: impl Display) -> Self {
        TranscodeError::Provider {
            code: None,
            message: message.to_string(),
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, TranscodeError::Provider { .. })
    }
}

impl From<anyhow::Error> for TranscodeError {
    fn from(err: anyhow::Error) -> Self {
        TranscodeError::Repository {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for TranscodeError {
    fn from(err: validator::ValidationErrors) -> Self {
        TranscodeError::InvalidSettings(err.to_string())
    }
}

impl ErrorMetadata for TranscodeError {
    fn http_status_code(&self) -> u16 {
        match self {
            TranscodeError::Provider { .. } => 502,
            TranscodeError::UnsupportedMedia(_) => 422,
            TranscodeError::Ownership { .. } => 403,
            TranscodeError::InvalidInput(_) | TranscodeError::InvalidSettings(_) => 400,
            TranscodeError::Repository { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            TranscodeError::Provider { .. } => "PROVIDER_ERROR",
            TranscodeError::UnsupportedMedia(_) => "UNSUPPORTED_MEDIA",
            TranscodeError::Ownership { .. } => "OWNERSHIP_ERROR",
            TranscodeError::InvalidInput(_) => "INVALID_INPUT",
            TranscodeError::InvalidSettings(_) => "INVALID_SETTINGS",
            TranscodeError::Repository { .. } => "REPOSITORY_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TranscodeError::Provider { .. } | TranscodeError::Repository { .. }
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            TranscodeError::Provider { .. } | TranscodeError::Repository { .. } => LogLevel::Error,
            TranscodeError::UnsupportedMedia(_) | TranscodeError::Ownership { .. } => {
                LogLevel::Warn
            }
            TranscodeError::InvalidInput(_) | TranscodeError::InvalidSettings(_) => {
                LogLevel::Debug
            }
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}
