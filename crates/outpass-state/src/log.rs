//! # Checkpoint Log Entries
//!
//! An append-only record of a resident passing the checkpoint, in either
//! direction, against an approved outpass.
//!
//! ## Lateness
//!
//! A return recorded strictly after the window end is late. An exit is never
//! late, however far past the window it happens. The flag is computed once,
//! at recording time, and never recomputed.
//!
//! ## Direction Policy
//!
//! By default any sequence of exits and returns is accepted.
//! [`DirectionPolicy::Alternating`] enforces exit → return → exit → … per
//! request.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use outpass_core::{LogEntryId, PrincipalId, RequestId, Timestamp};

use crate::request::{OutpassRequest, OutpassStatus};

// ─── Direction ───────────────────────────────────────────────────────

/// Which way the resident is crossing the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Leaving the facility.
    Exit,
    /// Coming back.
    Return,
}

impl Direction {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Return => "return",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized direction name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown direction: {0:?}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts `exit`/`return` and the gate terminal's `out`/`in`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exit" | "out" => Ok(Self::Exit),
            "return" | "in" => Ok(Self::Return),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A movement could not be recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// The referenced request is not approved.
    #[error("outpass {request_id} is {status}, not approved")]
    NotApproved {
        /// The request.
        request_id: RequestId,
        /// Its current status.
        status: OutpassStatus,
    },

    /// The direction does not follow the previous entry under the
    /// alternating policy.
    #[error("{attempted} is out of sequence for outpass {request_id} (previous: {})",
        previous.map(|d| d.as_str()).unwrap_or("none"))]
    OutOfSequence {
        /// The request.
        request_id: RequestId,
        /// Direction of the latest existing entry, if any.
        previous: Option<Direction>,
        /// The rejected direction.
        attempted: Direction,
    },
}

// ─── Policy ──────────────────────────────────────────────────────────

/// Ordering rule for movements against a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionPolicy {
    /// Any sequence of exits and returns.
    #[default]
    Permissive,
    /// Exits and returns must alternate, starting with an exit.
    Alternating,
}

impl DirectionPolicy {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Alternating => "alternating",
        }
    }

    /// Check `next` against the direction of the latest existing entry.
    pub fn check(
        &self,
        request_id: RequestId,
        previous: Option<Direction>,
        next: Direction,
    ) -> Result<(), LogError> {
        let allowed = match self {
            Self::Permissive => true,
            Self::Alternating => matches!(
                (previous, next),
                (None, Direction::Exit)
                    | (Some(Direction::Return), Direction::Exit)
                    | (Some(Direction::Exit), Direction::Return)
            ),
        };
        if allowed {
            Ok(())
        } else {
            Err(LogError::OutOfSequence {
                request_id,
                previous,
                attempted: next,
            })
        }
    }
}

impl std::fmt::Display for DirectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized policy name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown direction policy: {0:?}")]
pub struct UnknownPolicy(pub String);

impl FromStr for DirectionPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "alternating" => Ok(Self::Alternating),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

// ─── Entry ───────────────────────────────────────────────────────────

/// One recorded movement through the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry identifier.
    pub id: LogEntryId,
    /// The approved request this movement was made under.
    pub request_id: RequestId,
    /// The resident who moved.
    pub resident_id: PrincipalId,
    /// Which way.
    pub direction: Direction,
    /// The operator who recorded it.
    pub recorded_by: PrincipalId,
    /// When it was recorded.
    pub recorded_at: Timestamp,
    /// Whether this was a return after the window end.
    pub is_late: bool,
    /// Optional operator remark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Whether a movement at `at` against a window ending at `window_end` is a
/// late return.
pub fn is_late_return(direction: Direction, window_end: Timestamp, at: Timestamp) -> bool {
    direction == Direction::Return && at > window_end
}

impl LogEntry {
    /// Record a movement against an approved request.
    ///
    /// The resident is taken from the stored request. Blank notes are
    /// dropped.
    pub fn record(
        request: &OutpassRequest,
        direction: Direction,
        recorded_by: PrincipalId,
        recorded_at: Timestamp,
        notes: Option<String>,
    ) -> Result<Self, LogError> {
        let status = request.status();
        if status != OutpassStatus::Approved {
            return Err(LogError::NotApproved {
                request_id: request.id,
                status,
            });
        }
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Self {
            id: LogEntryId::new(),
            request_id: request.id,
            resident_id: request.requester_id,
            direction,
            recorded_by,
            recorded_at,
            is_late: is_late_return(direction, request.window.end(), recorded_at),
            notes,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{DecisionOutcome, DecisionRecord, OutpassDraft};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn request(outcome: Option<DecisionOutcome>) -> OutpassRequest {
        let mut req = OutpassRequest::submit(
            PrincipalId::new(),
            OutpassDraft {
                reason: "Family visit".to_string(),
                destination: "City Center".to_string(),
                window_start: ts("2024-01-01T14:00:00Z"),
                window_end: ts("2024-01-01T18:00:00Z"),
            },
            ts("2024-01-01T09:00:00Z"),
        )
        .unwrap();
        if let Some(outcome) = outcome {
            req.apply_decision(DecisionRecord {
                outcome,
                decided_by: PrincipalId::new(),
                decided_at: ts("2024-01-01T10:00:00Z"),
            })
            .unwrap();
        }
        req
    }

    #[test]
    fn exit_inside_window_is_not_late() {
        let req = request(Some(DecisionOutcome::Approved));
        let entry = LogEntry::record(
            &req,
            Direction::Exit,
            PrincipalId::new(),
            ts("2024-01-01T14:10:00Z"),
            None,
        )
        .unwrap();
        assert!(!entry.is_late);
        assert_eq!(entry.resident_id, req.requester_id);
        assert_eq!(entry.request_id, req.id);
    }

    #[test]
    fn return_after_window_is_late() {
        let req = request(Some(DecisionOutcome::Approved));
        let entry = LogEntry::record(
            &req,
            Direction::Return,
            PrincipalId::new(),
            ts("2024-01-01T19:00:00Z"),
            None,
        )
        .unwrap();
        assert!(entry.is_late);
    }

    #[test]
    fn return_exactly_at_window_end_is_on_time() {
        let end = ts("2024-01-01T18:00:00Z");
        assert!(!is_late_return(Direction::Return, end, end));
        assert!(is_late_return(
            Direction::Return,
            end,
            ts("2024-01-01T18:00:01Z")
        ));
    }

    #[test]
    fn exit_after_window_is_never_late() {
        let end = ts("2024-01-01T18:00:00Z");
        assert!(!is_late_return(
            Direction::Exit,
            end,
            ts("2024-01-02T18:00:00Z")
        ));
    }

    #[test]
    fn recording_requires_approval() {
        for (outcome, status) in [
            (None, OutpassStatus::Pending),
            (Some(DecisionOutcome::Rejected), OutpassStatus::Rejected),
        ] {
            let req = request(outcome);
            let err = LogEntry::record(
                &req,
                Direction::Exit,
                PrincipalId::new(),
                ts("2024-01-01T14:10:00Z"),
                None,
            )
            .unwrap_err();
            assert_eq!(
                err,
                LogError::NotApproved {
                    request_id: req.id,
                    status,
                }
            );
        }
    }

    #[test]
    fn blank_notes_are_dropped() {
        let req = request(Some(DecisionOutcome::Approved));
        let at = ts("2024-01-01T14:10:00Z");
        let blank =
            LogEntry::record(&req, Direction::Exit, PrincipalId::new(), at, Some("  ".into()))
                .unwrap();
        assert_eq!(blank.notes, None);
        let kept = LogEntry::record(
            &req,
            Direction::Exit,
            PrincipalId::new(),
            at,
            Some(" carried bag ".into()),
        )
        .unwrap();
        assert_eq!(kept.notes.as_deref(), Some("carried bag"));
    }

    #[test]
    fn permissive_policy_accepts_everything() {
        let id = RequestId::new();
        let policy = DirectionPolicy::Permissive;
        for previous in [None, Some(Direction::Exit), Some(Direction::Return)] {
            for next in [Direction::Exit, Direction::Return] {
                assert!(policy.check(id, previous, next).is_ok());
            }
        }
    }

    #[test]
    fn alternating_policy_matrix() {
        let id = RequestId::new();
        let policy = DirectionPolicy::Alternating;
        assert!(policy.check(id, None, Direction::Exit).is_ok());
        assert!(policy.check(id, Some(Direction::Exit), Direction::Return).is_ok());
        assert!(policy.check(id, Some(Direction::Return), Direction::Exit).is_ok());

        assert_eq!(
            policy.check(id, None, Direction::Return),
            Err(LogError::OutOfSequence {
                request_id: id,
                previous: None,
                attempted: Direction::Return,
            })
        );
        assert!(policy.check(id, Some(Direction::Exit), Direction::Exit).is_err());
        assert!(policy
            .check(id, Some(Direction::Return), Direction::Return)
            .is_err());
    }

    #[test]
    fn direction_parsing_accepts_gate_aliases() {
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Exit);
        assert_eq!("IN".parse::<Direction>().unwrap(), Direction::Return);
        assert_eq!("exit".parse::<Direction>().unwrap(), Direction::Exit);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            "Alternating".parse::<DirectionPolicy>().unwrap(),
            DirectionPolicy::Alternating
        );
        assert_eq!(DirectionPolicy::default(), DirectionPolicy::Permissive);
        assert!("strict".parse::<DirectionPolicy>().is_err());
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Direction::Return).unwrap(),
            "\"return\""
        );
    }

    proptest::proptest! {
        #[test]
        fn lateness_matches_clock_comparison(end in 0i64..2_000_000_000, delta in -100_000i64..100_000) {
            let end_ts = Timestamp::from_epoch_secs(end).unwrap();
            let at = end_ts.offset_by(chrono::Duration::seconds(delta));
            proptest::prop_assert_eq!(is_late_return(Direction::Return, end_ts, at), delta > 0);
            proptest::prop_assert!(!is_late_return(Direction::Exit, end_ts, at));
        }
    }
}
