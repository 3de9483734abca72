//! Error type shared by every file operation.

use std::fmt;
use std::io;

use protocol::ErrorCode;
use thiserror::Error;

/// Administrative switches that can turn an operation off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Uploading files.
    Upload,
    /// Creating folders.
    NewFolder,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("file upload"),
            Self::NewFolder => f.write_str("folder creation"),
        }
    }
}

/// Errors that can occur while resolving, listing or mutating files.
#[derive(Debug, Error)]
pub enum FileError {
    /// The request resolved outside the served root.
    #[error("path escapes the served root: {0}")]
    PathEscapesRoot(String),

    /// The operation is administratively disabled.
    #[error("{0} is disabled")]
    FeatureDisabled(Feature),

    /// The target does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operating system refused access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A required field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Refusal to delete the served root itself.
    #[error("refusing to delete the served root")]
    RootProtected,

    /// An upload exceeded the configured size limit.
    #[error("upload exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    /// Any other filesystem failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FileError {
    /// Convert an IO error, naming the affected request path.
    ///
    /// `context` should be the root-relative path, never the absolute one.
    pub fn from_io(err: io::Error, context: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(context.to_string()),
            io::ErrorKind::PermissionDenied => FileError::PermissionDenied(context.to_string()),
            _ => FileError::Internal(format!("{}: {}", context, err)),
        }
    }

    /// Error code reported to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            FileError::PathEscapesRoot(_) => ErrorCode::PathEscapesRoot,
            FileError::FeatureDisabled(_) => ErrorCode::FeatureDisabled,
            FileError::NotFound(_) => ErrorCode::NotFound,
            FileError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            FileError::InvalidInput(_) | FileError::RootProtected | FileError::TooLarge { .. } => {
                ErrorCode::InvalidInput
            }
            FileError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The root-relative path the error is about, when it names one.
    pub fn path(&self) -> Option<&str> {
        match self {
            FileError::PathEscapesRoot(path)
            | FileError::NotFound(path)
            | FileError::PermissionDenied(path) => Some(path),
            FileError::RootProtected => Some("/"),
            _ => None,
        }
    }
}
