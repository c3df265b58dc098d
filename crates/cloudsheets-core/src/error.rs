//! Error types for cloudsheets-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing or building requests.
///
/// These are detected before any network call is made.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid A1 range string
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Invalid column letters
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Invalid hex color code
    #[error("Invalid color code: {0}")]
    InvalidColor(String),

    /// Row number out of the addressable range
    #[error("Row number {0} out of bounds (max: {1})")]
    RowOutOfBounds(u64, u32),

    /// Sheet name with no resolved id
    #[error("Sheet not resolved: {0}")]
    UnresolvedSheet(String),

    /// Value that cannot be stored in a cell
    #[error("Unsupported cell value: {0}")]
    InvalidCellValue(String),

    /// Payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error stems from caller input
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, Error::Serialization(_) | Error::UnresolvedSheet(_))
    }
}
