//! Error types for the grid engine.

use gridcrawl_types::cell::CellId;
use thiserror::Error;

/// Boxed error raised by a provider, store or search collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum GridError {
    /// The boundary provider has no polygon for this country code.
    #[error("Country not found: {0}")]
    CountryNotFound(String),
    #[error("Cell not found: {0}")]
    CellNotFound(CellId),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Failure inside a boundary provider, grid store or search client.
    /// Passed through untouched; the engine never retries.
    #[error("Collaborator error: {source}")]
    Collaborator {
        #[source]
        source: BoxError,
    },
    /// A packed child would overlap an obstacle. Nothing was persisted.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot format")]
    InvalidFormat,
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GridError {
    /// Wrap an arbitrary collaborator failure.
    pub fn collaborator<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Collaborator { source: err.into() }
    }

    /// Whether this error came from a collaborator rather than the engine.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. } | Self::Io(_))
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "snapshot")]
impl From<bincode::Error> for GridError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_wraps_source() {
        let err = GridError::collaborator("connection reset");
        assert!(err.is_collaborator());
        assert_eq!(err.to_string(), "Collaborator error: connection reset");
    }

    #[test]
    fn test_not_found_message() {
        let err = GridError::CountryNotFound("XYZ".into());
        assert!(!err.is_collaborator());
        assert_eq!(err.to_string(), "Country not found: XYZ");
    }
}
