use crate::value::ValueKind;
use thiserror::Error;

pub type Result<T = (), E = RegistryError> = std::result::Result<T, E>;

pub(crate) const ERROR_FILE_NOT_FOUND: u32 = 2;
pub(crate) const ERROR_ACCESS_DENIED: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{operation} failed, not found: {target}")]
    NotFound {
        operation: &'static str,
        target: String,
    },

    #[error("{operation} failed, access denied: {target}")]
    AccessDenied {
        operation: &'static str,
        target: String,
    },

    #[error("Value '{name}' has type {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Value '{name}' holds malformed data: {reason}")]
    InvalidData { name: String, reason: String },

    #[error("{operation} failed on {target} with status {code}: {message}")]
    Os {
        operation: &'static str,
        target: String,
        code: u32,
        message: String,
    },
}

/// Coarse classification of a [`RegistryError`], for matching without fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AccessDenied,
    TypeMismatch,
    InvalidData,
    Os,
}

impl RegistryError {
    /// Translate an OS status code returned by `operation` on `target`.
    pub fn from_status(operation: &'static str, target: impl Into<String>, code: u32) -> Self {
        let target = target.into();
        match code {
            ERROR_FILE_NOT_FOUND => Self::NotFound { operation, target },
            ERROR_ACCESS_DENIED => Self::AccessDenied { operation, target },
            _ => Self::Os {
                operation,
                target,
                code,
                message: status_message(code),
            },
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidData { .. } => ErrorKind::InvalidData,
            Self::Os { .. } => ErrorKind::Os,
        }
    }

    /// The OS status code behind this error, if it came from an OS call.
    #[must_use]
    pub const fn status_code(&self) -> Option<u32> {
        match self {
            Self::NotFound { .. } => Some(ERROR_FILE_NOT_FOUND),
            Self::AccessDenied { .. } => Some(ERROR_ACCESS_DENIED),
            Self::Os { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(windows)]
fn status_message(code: u32) -> String {
    use windows::Win32::Foundation::WIN32_ERROR;

    WIN32_ERROR(code).to_hresult().message()
}

#[cfg(not(windows))]
fn status_message(code: u32) -> String {
    #[allow(clippy::cast_possible_wrap)]
    std::io::Error::from_raw_os_error(code as i32).to_string()
}
