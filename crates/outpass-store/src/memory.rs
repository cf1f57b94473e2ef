//! # In-Memory Backends
//!
//! Thread-safe, cloneable stores backed by `parking_lot` locks. Locks are
//! never held across an `.await`, and `parking_lot` locks do not poison, so
//! a panicking writer cannot wedge the store.
//!
//! Records are kept in insertion order alongside the id index, which is
//! what breaks ties between requests created within the same second.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use outpass_core::RequestId;
use outpass_state::{DecisionRecord, LogEntry, OutpassRequest, OutpassStatus};

use crate::error::StoreError;
use crate::traits::{ConditionalUpdate, LogFilter, LogLedger, RequestFilter, RequestStore, SortOrder};

// ─── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RequestTable {
    records: Vec<OutpassRequest>,
    index: HashMap<RequestId, usize>,
}

/// In-memory [`RequestStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRequestStore {
    table: Arc<RwLock<RequestTable>>,
}

impl MemoryRequestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.table.read().records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn insert(&self, request: &OutpassRequest) -> Result<(), StoreError> {
        let mut table = self.table.write();
        if table.index.contains_key(&request.id) {
            return Err(StoreError::Duplicate(request.id.to_string()));
        }
        let position = table.records.len();
        table.records.push(request.clone());
        table.index.insert(request.id, position);
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<OutpassRequest>, StoreError> {
        let table = self.table.read();
        Ok(table.index.get(&id).map(|&i| table.records[i].clone()))
    }

    async fn update_if_status(
        &self,
        id: RequestId,
        expected: OutpassStatus,
        decision: DecisionRecord,
    ) -> Result<ConditionalUpdate, StoreError> {
        let mut table = self.table.write();
        let Some(&position) = table.index.get(&id) else {
            return Ok(ConditionalUpdate::Missing);
        };
        let record = &mut table.records[position];
        if record.status() != expected || record.apply_decision(decision).is_err() {
            return Ok(ConditionalUpdate::Conflict {
                current: record.clone(),
            });
        }
        Ok(ConditionalUpdate::Applied(record.clone()))
    }

    async fn query(
        &self,
        filter: RequestFilter,
        order: SortOrder,
    ) -> Result<Vec<OutpassRequest>, StoreError> {
        let mut matched: Vec<OutpassRequest> = self
            .table
            .read()
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // Stable sort keeps insertion order within equal timestamps.
        matched.sort_by_key(|r| r.created_at);
        if order == SortOrder::NewestFirst {
            matched.reverse();
        }
        Ok(matched)
    }
}

// ─── Ledger ──────────────────────────────────────────────────────────

/// In-memory [`LogLedger`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLogLedger {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl MemoryLogLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogLedger for MemoryLogLedger {
    async fn append(&self, entry: &LogEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(StoreError::Duplicate(entry.id.to_string()));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn query(
        &self,
        filter: LogFilter,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let mut matched: Vec<LogEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.recorded_at);
        if order == SortOrder::NewestFirst {
            matched.reverse();
        }
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
