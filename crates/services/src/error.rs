//! Shared error types for the services crate.

use reqwest::StatusCode;
use thiserror::Error;

use storage::StoreError;

/// Errors from the backend API collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request failed with status {status}")]
    Status { status: StatusCode, body: String },

    #[error("giving up after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: StatusCode },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("malformed response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// The HTTP status this error carries, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::RetriesExhausted { status, .. } => Some(*status),
            Self::Http(err) => err.status(),
            Self::Encode(_) | Self::Decode(_) => None,
        }
    }

    /// True iff the backend rejected the request as unauthenticated.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

/// Errors emitted by the quiz session manager.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions loaded for this attempt")]
    NoQuestions,

    /// The backend rejected an anonymous submission. The caller can offer
    /// account creation instead of a generic failure message.
    #[error("authentication required to submit this diagnostic")]
    AuthRequired {
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors emitted by the guest reconciliation service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// Checked locally before any network call.
    #[error("guest submission has no questions to save")]
    EmptySubmission,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
