//! # Roles, Identity, and Capability Handles
//!
//! The facility has three kinds of principal. Rather than branching on a
//! role string wherever an operation is performed, each role is represented
//! by a capability handle that can only be minted from an [`Identity`]
//! holding that role:
//!
//! | Role                  | Handle                  | May                                  |
//! |-----------------------|-------------------------|--------------------------------------|
//! | `resident`            | [`Resident`]            | request leave, view own requests     |
//! | `supervisor`          | [`Supervisor`]          | decide, view all requests and logs   |
//! | `checkpoint_operator` | [`CheckpointOperator`]  | verify tokens, view approved & logs  |
//!
//! Operations shared by more than one role are bounded by the marker traits
//! [`ReadsApproved`] and [`ReadsLedger`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, CoreError};
use crate::identity::PrincipalId;

// ─── Role ────────────────────────────────────────────────────────────

/// The role an identity holds. Issued by the identity backend and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A resident who requests leave.
    Resident,
    /// A supervisor who approves or rejects requests.
    Supervisor,
    /// A gate operator who scans tokens and records movements.
    CheckpointOperator,
}

impl Role {
    /// Return the canonical string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Supervisor => "supervisor",
            Self::CheckpointOperator => "checkpoint_operator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    /// Parse a role name. The legacy profile names (`student`, `admin`,
    /// `guard`) are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resident" | "student" => Ok(Self::Resident),
            "supervisor" | "admin" => Ok(Self::Supervisor),
            "checkpoint_operator" | "checkpoint-operator" | "guard" => {
                Ok(Self::CheckpointOperator)
            }
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

// ─── Identity ────────────────────────────────────────────────────────

/// An authenticated principal: who is calling, and in what role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// The principal identifier.
    pub id: PrincipalId,
    /// The role the principal holds.
    pub role: Role,
}

impl Identity {
    /// Construct an identity.
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self { id, role }
    }

    /// Mint a [`Resident`] handle, if this identity is a resident.
    pub fn resident(&self) -> Result<Resident, AccessError> {
        self.require(Role::Resident).map(|id| Resident { id })
    }

    /// Mint a [`Supervisor`] handle, if this identity is a supervisor.
    pub fn supervisor(&self) -> Result<Supervisor, AccessError> {
        self.require(Role::Supervisor).map(|id| Supervisor { id })
    }

    /// Mint a [`CheckpointOperator`] handle, if this identity is a
    /// checkpoint operator.
    pub fn checkpoint_operator(&self) -> Result<CheckpointOperator, AccessError> {
        self.require(Role::CheckpointOperator)
            .map(|id| CheckpointOperator { id })
    }

    fn require(&self, required: Role) -> Result<PrincipalId, AccessError> {
        if self.role == required {
            Ok(self.id)
        } else {
            Err(AccessError::Forbidden {
                required,
                actual: self.role,
            })
        }
    }
}

/// Source of the caller's identity.
///
/// The core trusts whatever this returns; credential validation happens in
/// the implementor (e.g. the HTTP auth middleware).
pub trait IdentityContext {
    /// The identity of the current caller, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// The current identity, or [`AccessError::Unauthenticated`].
    fn require_identity(&self) -> Result<Identity, AccessError> {
        self.current_identity().ok_or(AccessError::Unauthenticated)
    }
}

impl IdentityContext for Identity {
    fn current_identity(&self) -> Option<Identity> {
        Some(*self)
    }
}

impl IdentityContext for Option<Identity> {
    fn current_identity(&self) -> Option<Identity> {
        *self
    }
}

// ─── Capability Handles ──────────────────────────────────────────────

/// Common behavior of every capability handle.
pub trait Capability: Send + Sync {
    /// The principal holding this capability.
    fn principal(&self) -> PrincipalId;

    /// The role this capability was minted from.
    fn role(&self) -> Role;
}

/// Capability to list approved requests.
pub trait ReadsApproved: Capability {}

/// Capability to read the checkpoint ledger.
pub trait ReadsLedger: Capability {}

/// Proof that the caller is a resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resident {
    id: PrincipalId,
}

/// Proof that the caller is a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supervisor {
    id: PrincipalId,
}

/// Proof that the caller is a checkpoint operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointOperator {
    id: PrincipalId,
}

impl Resident {
    /// The resident's principal id.
    pub fn id(&self) -> PrincipalId {
        self.id
    }
}

impl Supervisor {
    /// The supervisor's principal id.
    pub fn id(&self) -> PrincipalId {
        self.id
    }
}

impl CheckpointOperator {
    /// The operator's principal id.
    pub fn id(&self) -> PrincipalId {
        self.id
    }
}

impl Capability for Resident {
    fn principal(&self) -> PrincipalId {
        self.id
    }

    fn role(&self) -> Role {
        Role::Resident
    }
}

impl Capability for Supervisor {
    fn principal(&self) -> PrincipalId {
        self.id
    }

    fn role(&self) -> Role {
        Role::Supervisor
    }
}

impl Capability for CheckpointOperator {
    fn principal(&self) -> PrincipalId {
        self.id
    }

    fn role(&self) -> Role {
        Role::CheckpointOperator
    }
}

impl ReadsApproved for Supervisor {}
impl ReadsApproved for CheckpointOperator {}

impl ReadsLedger for Supervisor {}
impl ReadsLedger for CheckpointOperator {}
