//! Rows owned by the ledger store

use chrono::NaiveDate;
use serde::Serialize;

/// One user's progression row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProgression {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub points: i64,
    pub experience: i64,
    pub level: i64,
    /// Flag written by the last sign-in; whether that was *today* is decided
    /// by comparing `last_sign_date`, never by reading this flag.
    pub is_signed: bool,
    pub continuous_sign_days: i64,
    pub total_sign_days: i64,
    pub last_sign_date: NaiveDate,
    pub activity_score: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Append-only audit record of one points/experience change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointLedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub points: i64,
    pub experience: i64,
    pub reason: String,
    pub created_at: i64,
}

/// A like of `post_id` by `user_id`, rewarding `target_user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeEvent {
    pub id: i64,
    pub user_id: String,
    pub post_id: String,
    pub target_user_id: String,
    pub created_at: i64,
}

/// Level recomputation that actually changed the stored level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelChange {
    pub old_level: i64,
    pub new_level: i64,
}
