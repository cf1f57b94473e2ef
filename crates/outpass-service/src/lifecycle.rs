//! # Outpass Lifecycle Service
//!
//! Creates, decides, lists and tokenizes outpass requests. Every operation
//! takes the capability handle of its caller, so a checkpoint operator
//! cannot even name the call that decides a request.
//!
//! ## Decision Race
//!
//! `decide` never reads-then-writes. It hands the store a compare-and-swap
//! conditioned on `pending`; of two supervisors deciding the same request
//! concurrently, exactly one observes `Applied` and the other gets
//! [`OutpassError::InvalidState`] carrying the winner's outcome.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use outpass_checkpoint::CheckpointToken;
use outpass_core::{
    AccessError, Capability, Clock, Identity, PrincipalId, ReadsApproved, RequestId, Resident, Role,
    Supervisor,
};
use outpass_state::{DecisionOutcome, DecisionRecord, OutpassDraft, OutpassRequest, OutpassStatus};
use outpass_store::{ConditionalUpdate, RequestFilter, RequestStore, SortOrder};

use crate::error::OutpassError;

/// Supervisor dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpassSummary {
    /// All requests ever submitted.
    pub total: usize,
    /// Requests awaiting a decision.
    pub pending: usize,
    /// Approved requests.
    pub approved: usize,
    /// Rejected requests.
    pub rejected: usize,
    /// Distinct residents who have submitted at least one request.
    pub residents: usize,
}

/// Request lifecycle operations.
#[derive(Debug, Clone)]
pub struct OutpassLifecycle {
    requests: Arc<dyn RequestStore>,
    clock: Arc<dyn Clock>,
}

impl OutpassLifecycle {
    /// Build the service over a request store and a clock.
    pub fn new(requests: Arc<dyn RequestStore>, clock: Arc<dyn Clock>) -> Self {
        Self { requests, clock }
    }

    /// Submit a new request on behalf of `resident`. It starts `pending`.
    pub async fn create(
        &self,
        resident: &Resident,
        draft: OutpassDraft,
    ) -> Result<OutpassRequest, OutpassError> {
        let request = OutpassRequest::submit(resident.id(), draft, self.clock.now())?;
        self.requests.insert(&request).await?;

        metrics::counter!("outpass_requests_created_total").increment(1);
        tracing::info!(
            request_id = %request.id,
            requester = %request.requester_id,
            window_start = %request.window.start(),
            window_end = %request.window.end(),
            "outpass requested"
        );
        Ok(request)
    }

    /// Approve or reject a pending request.
    pub async fn decide(
        &self,
        supervisor: &Supervisor,
        request_id: RequestId,
        outcome: DecisionOutcome,
    ) -> Result<OutpassRequest, OutpassError> {
        let record = DecisionRecord {
            outcome,
            decided_by: supervisor.id(),
            decided_at: self.clock.now(),
        };
        match self
            .requests
            .update_if_status(request_id, OutpassStatus::Pending, record)
            .await?
        {
            ConditionalUpdate::Applied(request) => {
                metrics::counter!("outpass_decisions_total", "outcome" => outcome.as_str())
                    .increment(1);
                tracing::info!(
                    request_id = %request_id,
                    decided_by = %supervisor.id(),
                    outcome = %outcome,
                    "outpass decided"
                );
                Ok(request)
            }
            ConditionalUpdate::Conflict { current } => {
                tracing::debug!(
                    request_id = %request_id,
                    status = %current.status(),
                    "decision rejected, request already decided"
                );
                Err(OutpassError::InvalidState {
                    request_id,
                    status: current.status(),
                })
            }
            ConditionalUpdate::Missing => Err(OutpassError::NotFound(request_id)),
        }
    }

    /// The caller's own requests, most recent first.
    pub async fn list_for_requester(
        &self,
        resident: &Resident,
    ) -> Result<Vec<OutpassRequest>, OutpassError> {
        self.query(RequestFilter::by_requester(resident.id())).await
    }

    /// Any resident's requests, most recent first.
    pub async fn list_for_resident(
        &self,
        _supervisor: &Supervisor,
        resident_id: PrincipalId,
    ) -> Result<Vec<OutpassRequest>, OutpassError> {
        self.query(RequestFilter::by_requester(resident_id)).await
    }

    /// Requests awaiting a decision, most recent first.
    pub async fn list_pending(
        &self,
        _supervisor: &Supervisor,
    ) -> Result<Vec<OutpassRequest>, OutpassError> {
        self.query(RequestFilter::by_status(OutpassStatus::Pending))
            .await
    }

    /// Approved requests, most recent first.
    pub async fn list_approved<C>(&self, reader: &C) -> Result<Vec<OutpassRequest>, OutpassError>
    where
        C: ReadsApproved + ?Sized,
    {
        tracing::debug!(principal = %reader.principal(), role = %reader.role(), "listing approved requests");
        self.query(RequestFilter::by_status(OutpassStatus::Approved))
            .await
    }

    /// Fetch one request.
    ///
    /// Supervisors may read any request. Residents may read only their own;
    /// someone else's request is reported as not found rather than
    /// forbidden, so ids cannot be probed.
    pub async fn get(
        &self,
        caller: &Identity,
        request_id: RequestId,
    ) -> Result<OutpassRequest, OutpassError> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(OutpassError::NotFound(request_id));
        match caller.role {
            Role::Supervisor => request,
            Role::Resident => match request {
                Ok(r) if r.is_owned_by(caller.id) => Ok(r),
                _ => Err(OutpassError::NotFound(request_id)),
            },
            Role::CheckpointOperator => Err(AccessError::Forbidden {
                required: Role::Supervisor,
                actual: caller.role,
            }
            .into()),
        }
    }

    /// The checkpoint token of the caller's approved request.
    pub async fn issue_token(
        &self,
        resident: &Resident,
        request_id: RequestId,
    ) -> Result<CheckpointToken, OutpassError> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .filter(|r| r.is_owned_by(resident.id()))
            .ok_or(OutpassError::NotFound(request_id))?;
        if !request.is_approved() {
            return Err(OutpassError::NotApproved {
                request_id,
                status: request.status(),
            });
        }
        Ok(CheckpointToken::from_request(&request))
    }

    /// Dashboard counters across all requests.
    pub async fn summary(&self, _supervisor: &Supervisor) -> Result<OutpassSummary, OutpassError> {
        let all = self.query(RequestFilter::all()).await?;
        let mut summary = OutpassSummary {
            total: all.len(),
            ..OutpassSummary::default()
        };
        let mut residents = HashSet::new();
        for request in &all {
            residents.insert(request.requester_id);
            match request.status() {
                OutpassStatus::Pending => summary.pending += 1,
                OutpassStatus::Approved => summary.approved += 1,
                OutpassStatus::Rejected => summary.rejected += 1,
            }
        }
        summary.residents = residents.len();
        Ok(summary)
    }

    async fn query(&self, filter: RequestFilter) -> Result<Vec<OutpassRequest>, OutpassError> {
        Ok(self.requests.query(filter, SortOrder::NewestFirst).await?)
    }
}
