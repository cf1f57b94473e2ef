//! # Error Types
//!
//! Errors raised by the foundational types. Domain crates define their own
//! error enums and wrap these where needed.

use thiserror::Error;

use crate::capability::Role;

/// Errors from parsing or constructing core primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A timestamp string was not valid RFC 3339 (or not UTC where required).
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An identifier string was not a valid UUID.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A role name did not match any known role.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Errors raised when an identity is converted into a capability handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No identity is attached to the call.
    #[error("no authenticated identity")]
    Unauthenticated,

    /// The identity does not hold the role the operation requires.
    #[error("role '{required}' required, caller has '{actual}'")]
    Forbidden {
        /// Role the operation requires.
        required: Role,
        /// Role the caller actually holds.
        actual: Role,
    },
}
