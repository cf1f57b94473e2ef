//! # Service Errors
//!
//! One enum covering every failure a lifecycle or checkpoint operation can
//! report. Each variant is distinguishable so callers (the HTTP layer, the
//! CLI) can map them without string matching.

use thiserror::Error;

use outpass_checkpoint::TokenError;
use outpass_core::{AccessError, RequestId};
use outpass_state::{Direction, LogError, OutpassStatus, ValidationError};
use outpass_store::StoreError;

/// Failure of an outpass operation.
#[derive(Error, Debug)]
pub enum OutpassError {
    /// Input rejected at creation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No request with this id is visible to the caller.
    #[error("outpass {0} not found")]
    NotFound(RequestId),

    /// The request is not in a state that allows the operation.
    #[error("outpass {request_id} is {status}; only pending requests can be decided")]
    InvalidState {
        /// The request.
        request_id: RequestId,
        /// Its current status.
        status: OutpassStatus,
    },

    /// The request exists but is not approved.
    #[error("outpass {request_id} is {status}, not approved")]
    NotApproved {
        /// The request.
        request_id: RequestId,
        /// Its current status.
        status: OutpassStatus,
    },

    /// The presented payload is not a well-formed token.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] TokenError),

    /// The token names a request that belongs to a different resident.
    #[error("token does not match the resident of outpass {request_id}")]
    TokenMismatch {
        /// The request named by the token.
        request_id: RequestId,
    },

    /// The movement breaks the alternating exit/return sequence.
    #[error("{attempted} is out of sequence for outpass {request_id}")]
    OutOfSequence {
        /// The request.
        request_id: RequestId,
        /// Direction of the latest existing entry, if any.
        previous: Option<Direction>,
        /// The rejected direction.
        attempted: Direction,
    },

    /// The caller is unauthenticated or lacks the required capability.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The persistence backend failed.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl From<LogError> for OutpassError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::NotApproved { request_id, status } => {
                Self::NotApproved { request_id, status }
            }
            LogError::OutOfSequence {
                request_id,
                previous,
                attempted,
            } => Self::OutOfSequence {
                request_id,
                previous,
                attempted,
            },
        }
    }
}
