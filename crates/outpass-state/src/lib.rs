//! # outpass-state: Request Lifecycle and Checkpoint Entries
//!
//! Pure domain types with no I/O:
//!
//! - [`request`]: the `Pending → Approved | Rejected` lifecycle of an
//!   outpass request, with creation-time validation.
//! - [`log`]: checkpoint movements, the late-return rule, and the optional
//!   alternating direction policy.

pub mod log;
pub mod request;

pub use log::{
    is_late_return, Direction, DirectionPolicy, LogEntry, LogError, UnknownDirection,
    UnknownPolicy,
};
pub use request::{
    DecisionOutcome, DecisionRecord, OutpassDraft, OutpassRequest, OutpassStatus, TimeWindow,
    TransitionError, ValidationError, MAX_TEXT_LEN,
};
