//! Store error type.

use thiserror::Error;

/// A persistence backend failure.
///
/// These are infrastructure errors. Domain outcomes such as "not found" or
/// "already decided" are reported through return values, not through this
/// type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with the same identifier already exists.
    #[error("record {0} already exists")]
    Duplicate(String),

    /// A persisted row could not be mapped back to a domain value.
    #[error("corrupt row {id}: {reason}")]
    Corrupt {
        /// Identifier of the offending row.
        id: String,
        /// What could not be mapped.
        reason: String,
    },

    /// The database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Running embedded migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
