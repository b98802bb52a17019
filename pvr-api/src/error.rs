//! Shared error taxonomy for backend calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by every backend-facing operation.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error kinds a backend call can produce.
///
/// This is a taxonomy of *kinds*, not a carrier of backend-native error
/// payloads: adapters translate whatever their plugin reports into one of
/// these variants, and the calling component decides locally whether to
/// retry, prompt, or skip. Retries are never automatic.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
    /// Catch-all for untranslatable backend failures.
    #[error("unknown backend error")]
    Unknown,

    /// The backend declared the operation unsupported.
    #[error("operation not implemented by this backend")]
    NotImplemented,

    /// The adapter has not finished initializing, or is flagged ignored.
    #[error("client not ready")]
    NotReady,

    /// The backend is not connected.
    #[error("client not connected")]
    NotConnected,

    /// The backend reached its server but the server failed.
    #[error("backend server error")]
    ServerError,

    /// The backend's server did not answer in time.
    #[error("backend server timeout")]
    ServerTimeout,

    /// Local and backend state disagree; caller should re-enumerate.
    #[error("client state out of sync")]
    OutOfSync,

    /// A delete request was refused.
    #[error("item could not be deleted")]
    NotDeleted,

    /// A save/update request was refused.
    #[error("item could not be saved")]
    NotSaved,

    /// The targeted timer is currently recording; retry with force.
    #[error("recording in progress")]
    RecordingInProgress,

    /// The item already exists on the backend.
    #[error("item already present")]
    AlreadyPresent,
}

impl ApiError {
    /// Whether a user- or schedule-triggered retry can plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ApiError::NotImplemented)
    }

    /// Whether the failure should be surfaced to the user rather than
    /// silently skipped.
    pub fn is_notable(&self) -> bool {
        !matches!(self, ApiError::NotImplemented | ApiError::NotReady)
    }
}
