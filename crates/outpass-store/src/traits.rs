//! # Store Traits
//!
//! The two persistence seams the service layer depends on. Both are
//! object-safe so handlers can hold `Arc<dyn RequestStore>` and
//! `Arc<dyn LogLedger>` regardless of backend.

use async_trait::async_trait;

use outpass_core::{PrincipalId, RequestId};
use outpass_state::{DecisionRecord, LogEntry, OutpassRequest, OutpassStatus};

use crate::error::StoreError;

/// Ordering of list results by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recent first. Ties go to the later insertion.
    #[default]
    NewestFirst,
    /// Oldest first. Ties go to the earlier insertion.
    OldestFirst,
}

/// Filter for [`RequestStore::query`]. Empty fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFilter {
    /// Only requests owned by this resident.
    pub requester: Option<PrincipalId>,
    /// Only requests in this status.
    pub status: Option<OutpassStatus>,
}

impl RequestFilter {
    /// Match every request.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match requests owned by `requester`.
    pub fn by_requester(requester: PrincipalId) -> Self {
        Self {
            requester: Some(requester),
            status: None,
        }
    }

    /// Match requests in `status`.
    pub fn by_status(status: OutpassStatus) -> Self {
        Self {
            requester: None,
            status: Some(status),
        }
    }

    /// Whether `request` passes this filter.
    pub fn matches(&self, request: &OutpassRequest) -> bool {
        self.requester.map_or(true, |r| request.requester_id == r)
            && self.status.map_or(true, |s| request.status() == s)
    }
}

/// Filter for [`LogLedger::query`]. Empty fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Only entries recorded against this request.
    pub request_id: Option<RequestId>,
}

impl LogFilter {
    /// Match every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match entries for `request_id`.
    pub fn by_request(request_id: RequestId) -> Self {
        Self {
            request_id: Some(request_id),
        }
    }

    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.request_id.map_or(true, |id| entry.request_id == id)
    }
}

/// Result of a compare-and-swap decision write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalUpdate {
    /// The request was in the expected status and now carries the decision.
    Applied(OutpassRequest),
    /// The request exists but was not in the expected status. Nothing was
    /// written.
    Conflict {
        /// The request as currently stored.
        current: OutpassRequest,
    },
    /// No request with that id exists.
    Missing,
}

/// Durable storage of outpass requests.
#[async_trait]
pub trait RequestStore: Send + Sync + std::fmt::Debug {
    /// Persist a newly created request.
    async fn insert(&self, request: &OutpassRequest) -> Result<(), StoreError>;

    /// Fetch a request by id.
    async fn get(&self, id: RequestId) -> Result<Option<OutpassRequest>, StoreError>;

    /// Attach `decision` to the request only if its status is still
    /// `expected`. The check and the write are a single atomic step.
    async fn update_if_status(
        &self,
        id: RequestId,
        expected: OutpassStatus,
        decision: DecisionRecord,
    ) -> Result<ConditionalUpdate, StoreError>;

    /// List requests matching `filter`, ordered by creation time.
    async fn query(
        &self,
        filter: RequestFilter,
        order: SortOrder,
    ) -> Result<Vec<OutpassRequest>, StoreError>;
}

/// Append-only storage of checkpoint movements.
#[async_trait]
pub trait LogLedger: Send + Sync + std::fmt::Debug {
    /// Append one entry.
    async fn append(&self, entry: &LogEntry) -> Result<(), StoreError>;

    /// List entries matching `filter`, ordered by recording time, truncated
    /// to `limit` when given.
    async fn query(
        &self,
        filter: LogFilter,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, StoreError>;
}
