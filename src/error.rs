//! Error taxonomy for the operations callers invoke
//!
//! Every failure that crosses the library boundary is one of these values.
//! Each carries a stable [`ErrorKind`] so transports can map it without
//! inspecting messages.

use crate::claim::ValidationError;
use crate::gateway::{BackendUnavailable, GatewayError};
use crate::storage::{IndexSpec, StorageError};
use crate::verify::{Verification, VerifyError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Unauthenticated,
    BackendUnavailable,
    VerificationFailed,
    PersistenceFailed,
    /// A read against the store failed for a reason other than a missing index.
    QueryFailed,
    IndexRequired,
    NotFound,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::VerificationFailed => "verification_failed",
            ErrorKind::PersistenceFailed => "persistence_failed",
            ErrorKind::QueryFailed => "query_failed",
            ErrorKind::IndexRequired => "index_required",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission produced no report.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("you must be signed in to submit a claim")]
    Unauthenticated,

    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error(transparent)]
    BackendUnavailable(#[from] BackendUnavailable),

    #[error(transparent)]
    VerificationFailed(#[from] VerifyError),

    /// The claim was verified but the report could not be written. The
    /// verification is returned so the save can be retried without
    /// verifying again.
    #[error("failed to save report: {source}")]
    PersistenceFailed {
        verification: Verification,
        #[source]
        source: StorageError,
    },

    #[error("submission cancelled")]
    Cancelled,
}

impl SubmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmissionError::Unauthenticated => ErrorKind::Unauthenticated,
            SubmissionError::InvalidInput(_) => ErrorKind::InvalidInput,
            SubmissionError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            SubmissionError::VerificationFailed(_) => ErrorKind::VerificationFailed,
            SubmissionError::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            SubmissionError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Why reports could not be listed or fetched.
#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    BackendUnavailable(#[from] BackendUnavailable),

    /// The query needs a composite index that has not been declared.
    #[error("{0}")]
    IndexRequired(IndexSpec),

    #[error("report {0} not found")]
    NotFound(String),

    #[error("failed to load reports: {0}")]
    QueryFailed(StorageError),
}

impl ListError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ListError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            ListError::IndexRequired(_) => ErrorKind::IndexRequired,
            ListError::NotFound(_) => ErrorKind::NotFound,
            ListError::QueryFailed(_) => ErrorKind::QueryFailed,
        }
    }
}

impl From<StorageError> for ListError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::IndexRequired(spec) => ListError::IndexRequired(spec),
            other => ListError::QueryFailed(other),
        }
    }
}

impl From<GatewayError> for ListError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(e) => ListError::BackendUnavailable(e),
            GatewayError::Storage(e) => e.into(),
        }
    }
}

/// Why a profile upsert failed.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("you must be signed in to update a profile")]
    Unauthenticated,

    #[error(transparent)]
    BackendUnavailable(#[from] BackendUnavailable),

    #[error("failed to save profile: {0}")]
    PersistenceFailed(#[from] StorageError),
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProfileError::Unauthenticated => ErrorKind::Unauthenticated,
            ProfileError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            ProfileError::PersistenceFailed(_) => ErrorKind::PersistenceFailed,
        }
    }
}
