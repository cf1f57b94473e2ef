//! # API Route Modules
//!
//! - `outpasses`: resident submissions, supervisor decisions and
//!   dashboards, token issuance, per-request movement history.
//! - `checkpoint`: gate scans and the recent-movements feed.

pub mod checkpoint;
pub mod outpasses;
