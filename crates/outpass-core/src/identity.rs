//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier in the Outpass Stack. These prevent
//! identifier confusion: a `LogEntryId` cannot be passed where a `RequestId`
//! is expected, and a principal id is never mistaken for a record id.
//!
//! All identifiers serialize as their bare UUID string.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier of an outpass request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

/// Identifier of an authenticated principal (resident, supervisor, or
/// checkpoint operator). Issued by the identity backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

/// Unique identifier of a checkpoint log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntryId(pub Uuid);

macro_rules! uuid_newtype {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| CoreError::InvalidIdentifier(format!("{s:?}: {e}")))
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_newtype!(RequestId, "outpass");
uuid_newtype!(PrincipalId, "principal");
uuid_newtype!(LogEntryId, "log");
