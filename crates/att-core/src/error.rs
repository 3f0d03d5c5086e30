//! Error types for attendance processing.
//!
//! A deduplicated detection is not an error; see
//! [`RecordOutcome::Deduped`](crate::RecordOutcome::Deduped).

use thiserror::Error;

use crate::codec::DecodeError;
use crate::types::ValidationError;

/// Boxed error from a storage collaborator.
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced by ingestion, query and export.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// The identifier matched no stored identifier and is not decodable text.
    #[error("identifier '{identifier}' cannot be decoded: {source}")]
    Decode {
        identifier: String,
        #[source]
        source: DecodeError,
    },

    /// The identifier decoded, but no active employee matches it.
    #[error("no active employee found for identifier '{identifier}'")]
    NotFound { identifier: String },

    /// Caller input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The storage collaborator failed.
    #[error("storage failure: {0}")]
    Storage(#[source] StorageSource),

    /// Rendering the CSV export failed.
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

/// Coarse classification used to pick status codes and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    NotFound,
    Validation,
    Storage,
    Export,
}

impl AttendanceError {
    /// Wraps a storage collaborator error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode { .. } => ErrorKind::Decode,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Export(_) => ErrorKind::Export,
        }
    }
}

/// A type alias for results that return [`AttendanceError`].
pub type AttendanceResult<T> = Result<T, AttendanceError>;
