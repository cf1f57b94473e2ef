//! # outpass-service: Lifecycle and Checkpoint Services
//!
//! The two services that carry the Outpass Stack's behavior:
//!
//! - [`OutpassLifecycle`]: submit, decide (single-fire), list, fetch,
//!   token issuance and dashboard counters.
//! - [`CheckpointVerifier`]: decode → verify → append, plus ledger queries.
//!
//! Both hold their store and clock as trait objects; the same code runs
//! over the in-memory and PostgreSQL backends.

pub mod error;
pub mod lifecycle;
pub mod verifier;

pub use error::OutpassError;
pub use lifecycle::{OutpassLifecycle, OutpassSummary};
pub use verifier::{CheckpointVerifier, ScanSource, DEFAULT_RECENT_LIMIT};
