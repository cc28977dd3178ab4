//! Ledger store: user progression rows, the point ledger and like events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ ProgressionService   │
//! └──────────┬───────────┘
//!            │ traits below
//!   ┌────────┼─────────────────┐
//!   ▼        ▼                 ▼
//! users    points          statistics
//!   └────────┼─────────────────┘
//!            ▼
//!     LedgerDb (SQLite)
//! ```
//!
//! Every mutating operation runs in a single `IMMEDIATE` transaction; the
//! transaction rolls back when dropped, so any early return leaves the store
//! untouched.

mod db;
mod error;
mod models;
mod points;
mod statistics;
mod users;

use std::collections::BTreeMap;

use chrono::NaiveDate;

pub use db::LedgerDb;
pub use error::LedgerError;
pub use models::{LevelChange, LikeEvent, PointLedgerEntry, UserProgression};
pub use points::SqlitePointsRepository;
pub use statistics::SqliteStatisticsRepository;
pub use users::SqliteUserRepository;

use crate::progression::MonthWindow;

/// Operations on a single user's progression row
pub trait UserRepository: Send + Sync {
    /// Return the user's row, creating it with seed balances if absent.
    ///
    /// Concurrent first accesses for the same id resolve to one row.
    fn fetch_or_create(&self, user_id: &str, username: &str) -> Result<UserProgression, LedgerError>;

    /// Plain lookup, never creates
    fn get(&self, user_id: &str) -> Result<Option<UserProgression>, LedgerError>;

    /// Mark the user signed on `signed_on` with the given streak counters.
    ///
    /// Only writes when the stored `last_sign_date` is before `signed_on`;
    /// otherwise fails with `AlreadySigned`, so two racing sign-ins for one
    /// day cannot both proceed to the reward.
    fn update_sign_in_state(
        &self,
        user_id: &str,
        continuous_days: i64,
        total_days: i64,
        signed_on: NaiveDate,
    ) -> Result<(), LedgerError>;

    /// Recompute the level from current experience; `Some` only when it changed
    fn update_level(&self, user_id: &str) -> Result<Option<LevelChange>, LedgerError>;

    /// Add `delta` to the activity score (clamped at zero)
    fn update_activity_score(&self, user_id: &str, delta: i64) -> Result<(), LedgerError>;
}

/// Operations spanning the ledger tables and the user row
pub trait PointsRepository: Send + Sync {
    /// Write one ledger entry and add the deltas to the user's balances, atomically
    fn apply_delta(
        &self,
        user_id: &str,
        delta_points: i64,
        delta_experience: i64,
        reason: &str,
    ) -> Result<PointLedgerEntry, LedgerError>;

    /// Record a like once per (liker, post) and reward the post's author.
    ///
    /// A target with no progression row still gets the like recorded; only the
    /// reward is skipped, and no row is created for it.
    fn record_like(
        &self,
        user_id: &str,
        post_id: &str,
        target_user_id: &str,
    ) -> Result<LikeEvent, LedgerError>;

    /// Most recent ledger entries for a user, newest first
    fn list_entries(&self, user_id: &str, limit: usize) -> Result<Vec<PointLedgerEntry>, LedgerError>;
}

/// Read-only cross-user aggregations
pub trait StatisticsRepository: Send + Sync {
    fn level_distribution(&self) -> Result<BTreeMap<i64, i64>, LedgerError>;

    /// Mean points over all users (0.0 with no users)
    fn average_points(&self) -> Result<f64, LedgerError>;

    /// Sum of |points| over negative ledger entries created inside `window`
    fn monthly_points_consumed(&self, window: MonthWindow) -> Result<i64, LedgerError>;
}
