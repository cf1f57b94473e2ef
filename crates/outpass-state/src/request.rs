//! # Outpass Request Lifecycle
//!
//! Models a resident's request for temporary leave and the single
//! supervisor decision that settles it.
//!
//! ## States
//!
//! ```text
//!            ┌──approve──▶ Approved (terminal)
//! Pending ───┤
//!            └──reject───▶ Rejected (terminal)
//! ```
//!
//! There is no transition out of `Approved` or `Rejected`, and no self-loop
//! on `Pending`. A retried decision on an already-decided request is an
//! error, never a silent success.
//!
//! ## Design Decision
//!
//! The decision is stored as one optional [`DecisionRecord`] rather than as
//! a status plus two nullable columns. The status is derived from it, so
//! "`decided_by`/`decided_at` are set iff status ≠ pending" holds by
//! construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use outpass_core::{PrincipalId, RequestId, Timestamp};

/// Maximum length, in characters, of the free-text fields.
pub const MAX_TEXT_LEN: usize = 1000;

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of an outpass request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutpassStatus {
    /// Submitted, awaiting a supervisor decision.
    #[default]
    Pending,
    /// Approved by a supervisor (terminal).
    Approved,
    /// Rejected by a supervisor (terminal).
    Rejected,
}

impl OutpassStatus {
    /// Canonical lowercase name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Convert a canonical name back to a status. Returns `None` for any
    /// other input.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether no further transition is defined from this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The statuses reachable from this one in a single transition.
    pub fn valid_transitions(&self) -> &'static [OutpassStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }
}

impl std::fmt::Display for OutpassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Decision ────────────────────────────────────────────────────────

/// The outcome a supervisor may choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Grant the leave.
    Approved,
    /// Refuse the leave.
    Rejected,
}

impl DecisionOutcome {
    /// The status this outcome moves a request into.
    pub fn status(&self) -> OutpassStatus {
        match self {
            Self::Approved => OutpassStatus::Approved,
            Self::Rejected => OutpassStatus::Rejected,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who decided, what, and when. Present on a request iff it is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// The chosen outcome.
    pub outcome: DecisionOutcome,
    /// The supervisor who decided.
    pub decided_by: PrincipalId,
    /// When the decision was made.
    pub decided_at: Timestamp,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Input rejected when a request is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required free-text field was empty or whitespace.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A free-text field exceeded [`MAX_TEXT_LEN`].
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// The limit.
        max: usize,
    },

    /// The window does not satisfy `start < end`.
    #[error("window start {start} must be before window end {end}")]
    InvalidWindow {
        /// Requested start.
        start: Timestamp,
        /// Requested end.
        end: Timestamp,
    },
}

/// A decision could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The request was already decided; decisions are final.
    #[error("outpass {request_id} is already {status}; decisions are final")]
    AlreadyDecided {
        /// The request.
        request_id: RequestId,
        /// Its current status.
        status: OutpassStatus,
    },
}

// ─── Window ──────────────────────────────────────────────────────────

/// The validity window of a leave, `start < end`.
///
/// Deserialization goes through [`TimeWindow::new`], so a stored or
/// transmitted window is held to the same rule as a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

#[derive(Deserialize)]
struct WindowBounds {
    start: Timestamp,
    end: Timestamp,
}

impl TryFrom<WindowBounds> for TimeWindow {
    type Error = ValidationError;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl TimeWindow {
    /// Construct a window, rejecting `start >= end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// When the leave begins.
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// When the resident must be back.
    pub fn end(&self) -> Timestamp {
        self.end
    }
}

// ─── Draft ───────────────────────────────────────────────────────────

/// The resident-supplied fields of a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpassDraft {
    /// Why the resident is leaving.
    pub reason: String,
    /// Where the resident is going.
    pub destination: String,
    /// Requested departure.
    pub window_start: Timestamp,
    /// Requested return deadline.
    pub window_end: Timestamp,
}

fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(trimmed.to_string())
}

// ─── Request ─────────────────────────────────────────────────────────

/// An outpass request and its (at most one) decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpassRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The resident who owns the request.
    pub requester_id: PrincipalId,
    /// Why the resident is leaving.
    pub reason: String,
    /// Where the resident is going.
    pub destination: String,
    /// The validity window.
    pub window: TimeWindow,
    /// The supervisor decision, once made.
    pub decision: Option<DecisionRecord>,
    /// When the request was submitted.
    pub created_at: Timestamp,
    /// When the request last changed.
    pub updated_at: Timestamp,
}

impl OutpassRequest {
    /// Validate a draft and create a new pending request.
    pub fn submit(
        requester_id: PrincipalId,
        draft: OutpassDraft,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let reason = require_text("reason", &draft.reason)?;
        let destination = require_text("destination", &draft.destination)?;
        let window = TimeWindow::new(draft.window_start, draft.window_end)?;
        Ok(Self {
            id: RequestId::new(),
            requester_id,
            reason,
            destination,
            window,
            decision: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Current lifecycle status, derived from the decision.
    pub fn status(&self) -> OutpassStatus {
        self.decision
            .map(|d| d.outcome.status())
            .unwrap_or_default()
    }

    /// The supervisor who decided, if decided.
    pub fn decided_by(&self) -> Option<PrincipalId> {
        self.decision.map(|d| d.decided_by)
    }

    /// When the request was decided, if decided.
    pub fn decided_at(&self) -> Option<Timestamp> {
        self.decision.map(|d| d.decided_at)
    }

    /// Whether the request is approved.
    pub fn is_approved(&self) -> bool {
        self.status() == OutpassStatus::Approved
    }

    /// Whether `principal` owns this request.
    pub fn is_owned_by(&self, principal: PrincipalId) -> bool {
        self.requester_id == principal
    }

    /// Apply a supervisor decision (PENDING → APPROVED | REJECTED).
    ///
    /// Fails if the request is already decided.
    pub fn apply_decision(&mut self, record: DecisionRecord) -> Result<(), TransitionError> {
        let status = self.status();
        if status != OutpassStatus::Pending {
            return Err(TransitionError::AlreadyDecided {
                request_id: self.id,
                status,
            });
        }
        self.decision = Some(record);
        self.updated_at = record.decided_at;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
