//! # outpass-store: Request Store and Checkpoint Ledger
//!
//! The persistence seams of the Outpass Stack:
//!
//! - [`RequestStore`]: insert, fetch, compare-and-swap decision write, and
//!   filtered listing of outpass requests.
//! - [`LogLedger`]: append-only checkpoint movements with filtered,
//!   ordered, optionally limited queries.
//!
//! Two backends implement both traits: [`memory`] for development and
//! tests, and [`postgres`] for durable deployments.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use memory::{MemoryLogLedger, MemoryRequestStore};
pub use postgres::{init_pool, PgLogLedger, PgRequestStore};
pub use traits::{
    ConditionalUpdate, LogFilter, LogLedger, RequestFilter, RequestStore, SortOrder,
};
