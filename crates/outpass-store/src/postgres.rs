//! # PostgreSQL Backends
//!
//! Durable [`RequestStore`] and [`LogLedger`] implementations over SQLx.
//!
//! The database layer is optional. [`init_pool`] returns `None` when
//! `DATABASE_URL` is unset, and callers fall back to the in-memory backends.
//!
//! Lifecycle rules are enforced in `outpass-state`; the schema repeats the
//! structural ones (window ordering, decision consistency) as CHECK
//! constraints. The decision write is a single conditional `UPDATE`, so two
//! supervisors racing on the same request cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use outpass_core::{LogEntryId, PrincipalId, RequestId, Timestamp};
use outpass_state::{
    DecisionOutcome, DecisionRecord, Direction, LogEntry, OutpassRequest, OutpassStatus,
    TimeWindow,
};

use crate::error::StoreError;
use crate::traits::{ConditionalUpdate, LogFilter, LogLedger, RequestFilter, RequestStore, SortOrder};

/// Connect to `DATABASE_URL` and apply embedded migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory mode).
pub async fn init_pool() -> Result<Option<PgPool>, StoreError> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set, running with in-memory stores. \
                 Requests and checkpoint logs will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

const REQUEST_COLUMNS: &str = "id, requester_id, reason, destination, window_start, window_end, \
     status, decided_by, decided_at, created_at, updated_at";

const LOG_COLUMNS: &str =
    "id, request_id, resident_id, direction, recorded_by, recorded_at, is_late, notes";

// ─── Requests ────────────────────────────────────────────────────────

/// PostgreSQL [`RequestStore`] over the `outpass_requests` table.
#[derive(Debug, Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    /// Wrap a connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn insert(&self, request: &OutpassRequest) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO outpass_requests
                 (id, requester_id, reason, destination, window_start, window_end,
                  status, decided_by, decided_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(request.id.0)
        .bind(request.requester_id.0)
        .bind(&request.reason)
        .bind(&request.destination)
        .bind(*request.window.start().as_datetime())
        .bind(*request.window.end().as_datetime())
        .bind(request.status().as_str())
        .bind(request.decided_by().map(|p| p.0))
        .bind(request.decided_at().map(|t| *t.as_datetime()))
        .bind(*request.created_at.as_datetime())
        .bind(*request.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(request.id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<OutpassRequest>, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM outpass_requests WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RequestRow::into_request).transpose()
    }

    async fn update_if_status(
        &self,
        id: RequestId,
        expected: OutpassStatus,
        decision: DecisionRecord,
    ) -> Result<ConditionalUpdate, StoreError> {
        let updated = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE outpass_requests
                SET status = $3, decided_by = $4, decided_at = $5, updated_at = $5
              WHERE id = $1 AND status = $2
          RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id.0)
        .bind(expected.as_str())
        .bind(decision.outcome.as_str())
        .bind(decision.decided_by.0)
        .bind(*decision.decided_at.as_datetime())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(ConditionalUpdate::Applied(row.into_request()?));
        }
        match self.get(id).await? {
            Some(current) => Ok(ConditionalUpdate::Conflict { current }),
            None => Ok(ConditionalUpdate::Missing),
        }
    }

    async fn query(
        &self,
        filter: RequestFilter,
        order: SortOrder,
    ) -> Result<Vec<OutpassRequest>, StoreError> {
        let direction = sql_direction(order);
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM outpass_requests
              WHERE ($1::uuid IS NULL OR requester_id = $1)
                AND ($2::text IS NULL OR status = $2)
              ORDER BY created_at {direction}, seq {direction}"
        ))
        .bind(filter.requester.map(|p| p.0))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RequestRow::into_request).collect()
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    requester_id: Uuid,
    reason: String,
    destination: String,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    status: String,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self) -> Result<OutpassRequest, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.to_string(),
            reason,
        };
        let status = OutpassStatus::from_name(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status {:?}", self.status)))?;
        let window = TimeWindow::new(
            Timestamp::from_utc(self.window_start),
            Timestamp::from_utc(self.window_end),
        )
        .map_err(|e| corrupt(e.to_string()))?;

        let outcome = match status {
            OutpassStatus::Pending => None,
            OutpassStatus::Approved => Some(DecisionOutcome::Approved),
            OutpassStatus::Rejected => Some(DecisionOutcome::Rejected),
        };
        let decision = match (outcome, self.decided_by, self.decided_at) {
            (None, None, None) => None,
            (Some(outcome), Some(by), Some(at)) => Some(DecisionRecord {
                outcome,
                decided_by: PrincipalId(by),
                decided_at: Timestamp::from_utc(at),
            }),
            _ => {
                return Err(corrupt(format!(
                    "decision columns inconsistent with status {status}"
                )))
            }
        };

        Ok(OutpassRequest {
            id: RequestId(self.id),
            requester_id: PrincipalId(self.requester_id),
            reason: self.reason,
            destination: self.destination,
            window,
            decision,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}

// ─── Ledger ──────────────────────────────────────────────────────────

/// PostgreSQL [`LogLedger`] over the `checkpoint_logs` table.
#[derive(Debug, Clone)]
pub struct PgLogLedger {
    pool: PgPool,
}

impl PgLogLedger {
    /// Wrap a connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogLedger for PgLogLedger {
    async fn append(&self, entry: &LogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO checkpoint_logs
                 (id, request_id, resident_id, direction, recorded_by, recorded_at, is_late, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id.0)
        .bind(entry.request_id.0)
        .bind(entry.resident_id.0)
        .bind(entry.direction.as_str())
        .bind(entry.recorded_by.0)
        .bind(*entry.recorded_at.as_datetime())
        .bind(entry.is_late)
        .bind(entry.notes.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        filter: LogFilter,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let direction = sql_direction(order);
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows = sqlx::query_as::<_, LogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM checkpoint_logs
              WHERE ($1::uuid IS NULL OR request_id = $1)
              ORDER BY recorded_at {direction}, seq {direction}
              LIMIT $2"
        ))
        .bind(filter.request_id.map(|r| r.0))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LogRow::into_entry).collect()
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: Uuid,
    request_id: Uuid,
    resident_id: Uuid,
    direction: String,
    recorded_by: Uuid,
    recorded_at: DateTime<Utc>,
    is_late: bool,
    notes: Option<String>,
}

impl LogRow {
    fn into_entry(self) -> Result<LogEntry, StoreError> {
        let direction: Direction = self.direction.parse().map_err(|e| StoreError::Corrupt {
            id: self.id.to_string(),
            reason: format!("{e}"),
        })?;
        Ok(LogEntry {
            id: LogEntryId(self.id),
            request_id: RequestId(self.request_id),
            resident_id: PrincipalId(self.resident_id),
            direction,
            recorded_by: PrincipalId(self.recorded_by),
            recorded_at: Timestamp::from_utc(self.recorded_at),
            is_late: self.is_late,
            notes: self.notes,
        })
    }
}

fn sql_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::NewestFirst => "DESC",
        SortOrder::OldestFirst => "ASC",
    }
}
