//! Error types for the cloudsheets facade.

use std::fmt;

use thiserror::Error;

/// Kind of remote resource named in a [`Error::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Spreadsheet,
    Sheet,
    File,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Spreadsheet => "Spreadsheet",
            ResourceKind::Sheet => "Sheet",
            ResourceKind::File => "File",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the spreadsheet and drive facades.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },

    #[error("Remote call failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error(transparent)]
    Core(#[from] cloudsheets_core::Error),
}

impl Error {
    pub(crate) fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether the remote side reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether another attempt at the same call could succeed.
    ///
    /// Missing resources, bad input and missing credentials are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::NotFound { .. } | Error::Core(_) | Error::Auth(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let missing = Error::not_found(ResourceKind::Sheet, "Sheet9");
        assert!(missing.is_not_found());
        assert!(!missing.is_retryable());

        let remote = Error::Remote {
            status: 503,
            message: "backend unavailable".into(),
        };
        assert!(!remote.is_not_found());
        assert!(remote.is_retryable());

        let bad_range = Error::from(cloudsheets_core::Error::InvalidRange("A0".into()));
        assert!(!bad_range.is_retryable());
        assert!(!Error::Auth("no credentials".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let missing = Error::not_found(ResourceKind::Spreadsheet, "abc123");
        assert_eq!(missing.to_string(), "Spreadsheet not found: abc123");

        let core = Error::from(cloudsheets_core::Error::InvalidColor("zz".into()));
        assert_eq!(core.to_string(), "Invalid color code: zz");
    }
}
