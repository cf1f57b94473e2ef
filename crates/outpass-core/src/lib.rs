//! # outpass-core: Foundational Types for the Outpass Stack
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! primitives every other crate builds on:
//!
//! 1. **Newtype identifiers.** `RequestId`, `PrincipalId`, `LogEntryId`,
//!    so you cannot pass a log entry id where a request id is expected.
//!
//! 2. **Explicit identity.** [`Identity`] is handed to every core call by the
//!    caller (via [`IdentityContext`]). Nothing reads ambient session state.
//!
//! 3. **Capability handles.** [`Resident`], [`Supervisor`] and
//!    [`CheckpointOperator`] can only be obtained from an identity holding
//!    the matching role. Operations take the handle, so a role check cannot
//!    be forgotten by a caller.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision,
//!    and the current time always comes from an injected [`Clock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `outpass-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod capability;
pub mod error;
pub mod identity;
pub mod temporal;

pub use capability::{
    Capability, CheckpointOperator, Identity, IdentityContext, ReadsApproved, ReadsLedger,
    Resident, Role, Supervisor,
};
pub use error::{AccessError, CoreError};
pub use identity::{LogEntryId, PrincipalId, RequestId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
