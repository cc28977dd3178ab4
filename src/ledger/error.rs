//! Errors reported by the ledger repositories

use chrono::NaiveDate;

/// Failures surfaced by repository operations.
///
/// `NotFound`, `AlreadyExists`, `AlreadySigned` and `InsufficientPoints` are
/// conditions the service knows how to turn into business outcomes; `Database`
/// is always an infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("user {0} not found")]
    NotFound(String),

    #[error("user {user_id} already liked post {post_id}")]
    AlreadyExists { user_id: String, post_id: String },

    #[error("user {user_id} already signed in on {day}")]
    AlreadySigned { user_id: String, day: NaiveDate },

    #[error("insufficient points: balance {balance}, requested {requested}")]
    InsufficientPoints { balance: i64, requested: i64 },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when SQLite rejected a write because of a UNIQUE/PK constraint
    pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
