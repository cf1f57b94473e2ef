//! # Checkpoint Verifier
//!
//! Turns a presented token into exactly one ledger entry, or into a
//! rejection. The request itself is never modified here.
//!
//! ## Verification Order
//!
//! 1. Look up the request named by the token. Absent → `NotFound`.
//! 2. Status must be `approved` → otherwise `NotApproved`.
//! 3. The token's resident must be the request's owner → otherwise
//!    `TokenMismatch`.
//! 4. Under [`DirectionPolicy::Alternating`], the direction must follow the
//!    latest entry for the request → otherwise `OutOfSequence`.
//! 5. Append one entry with `is_late` computed against the stored window.
//!
//! The stored request is authoritative. Token fields other than the two ids
//! (destination, window) are informational and are not trusted for the
//! lateness check.

use std::sync::Arc;

use outpass_checkpoint::{decode, decode_manual, CheckpointToken};
use outpass_core::{Capability, CheckpointOperator, Clock, ReadsLedger, RequestId};
use outpass_state::{Direction, DirectionPolicy, LogEntry};
use outpass_store::{LogFilter, LogLedger, RequestStore, SortOrder};

use crate::error::OutpassError;

/// Number of entries returned by [`CheckpointVerifier::recent`] when no
/// limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// How the payload reached the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanSource {
    /// Read by a scanner; used verbatim.
    #[default]
    Scanned,
    /// Typed by the operator; surrounding whitespace is trimmed.
    Manual,
}

/// Checkpoint verification and ledger queries.
#[derive(Debug, Clone)]
pub struct CheckpointVerifier {
    requests: Arc<dyn RequestStore>,
    ledger: Arc<dyn LogLedger>,
    clock: Arc<dyn Clock>,
    policy: DirectionPolicy,
}

impl CheckpointVerifier {
    /// Build a verifier with the permissive direction policy.
    pub fn new(
        requests: Arc<dyn RequestStore>,
        ledger: Arc<dyn LogLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            requests,
            ledger,
            clock,
            policy: DirectionPolicy::default(),
        }
    }

    /// Replace the direction policy.
    pub fn with_policy(mut self, policy: DirectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active direction policy.
    pub fn policy(&self) -> DirectionPolicy {
        self.policy
    }

    /// Verify a decoded token and record the movement.
    pub async fn verify(
        &self,
        operator: &CheckpointOperator,
        token: &CheckpointToken,
        direction: Direction,
        notes: Option<String>,
    ) -> Result<LogEntry, OutpassError> {
        let request_id = token.request_id;
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(OutpassError::NotFound(request_id))?;
        if !request.is_approved() {
            tracing::info!(
                request_id = %request_id,
                status = %request.status(),
                "checkpoint scan rejected, outpass not approved"
            );
            return Err(OutpassError::NotApproved {
                request_id,
                status: request.status(),
            });
        }
        if request.requester_id != token.requester_id {
            tracing::warn!(
                request_id = %request_id,
                token_resident = %token.requester_id,
                "checkpoint scan rejected, token resident does not match outpass"
            );
            return Err(OutpassError::TokenMismatch { request_id });
        }

        if self.policy == DirectionPolicy::Alternating {
            let previous = self.latest_direction(request_id).await?;
            self.policy.check(request_id, previous, direction)?;
        }

        let entry = LogEntry::record(
            &request,
            direction,
            operator.id(),
            self.clock.now(),
            notes,
        )?;
        self.ledger.append(&entry).await?;

        metrics::counter!(
            "checkpoint_scans_total",
            "direction" => direction.as_str(),
            "late" => if entry.is_late { "true" } else { "false" }
        )
        .increment(1);
        if entry.is_late {
            tracing::warn!(
                request_id = %request_id,
                resident = %entry.resident_id,
                window_end = %request.window.end(),
                recorded_at = %entry.recorded_at,
                "late return recorded"
            );
        } else {
            tracing::info!(
                request_id = %request_id,
                resident = %entry.resident_id,
                direction = %direction,
                "checkpoint movement recorded"
            );
        }
        Ok(entry)
    }

    /// Decode a raw payload and verify it.
    pub async fn scan(
        &self,
        operator: &CheckpointOperator,
        payload: &str,
        source: ScanSource,
        direction: Direction,
        notes: Option<String>,
    ) -> Result<LogEntry, OutpassError> {
        let token = match source {
            ScanSource::Scanned => decode(payload),
            ScanSource::Manual => decode_manual(payload),
        }
        .map_err(|e| {
            tracing::info!(error = %e, ?source, "checkpoint payload rejected");
            e
        })?;
        self.verify(operator, &token, direction, notes).await
    }

    /// All entries for one request, oldest first.
    pub async fn entries_for_request<C>(
        &self,
        reader: &C,
        request_id: RequestId,
    ) -> Result<Vec<LogEntry>, OutpassError>
    where
        C: ReadsLedger + ?Sized,
    {
        tracing::debug!(principal = %reader.principal(), role = %reader.role(), %request_id, "reading request movements");
        if self.requests.get(request_id).await?.is_none() {
            return Err(OutpassError::NotFound(request_id));
        }
        Ok(self
            .ledger
            .query(LogFilter::by_request(request_id), SortOrder::OldestFirst, None)
            .await?)
    }

    /// The latest entries across all requests, newest first.
    pub async fn recent<C>(
        &self,
        reader: &C,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, OutpassError>
    where
        C: ReadsLedger + ?Sized,
    {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        tracing::debug!(principal = %reader.principal(), role = %reader.role(), limit, "reading recent movements");
        Ok(self
            .ledger
            .query(LogFilter::all(), SortOrder::NewestFirst, Some(limit))
            .await?)
    }

    async fn latest_direction(&self, request_id: RequestId) -> Result<Option<Direction>, OutpassError> {
        let latest = self
            .ledger
            .query(LogFilter::by_request(request_id), SortOrder::NewestFirst, Some(1))
            .await?;
        Ok(latest.first().map(|e| e.direction))
    }
}
