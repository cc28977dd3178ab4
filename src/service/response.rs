//! Response records returned by the service

use chrono::NaiveDate;
use serde::Serialize;

use crate::ledger::UserProgression;
use crate::progression::{Level, NEVER_SIGNED, level_for_experience};

/// Business outcome code carried by [`CommonResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    None,
    PointsInsufficient,
    AlreadySigned,
    AlreadyLiked,
}

/// Success or expected business failure of a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonResponse {
    pub success: bool,
    pub message: String,
    pub error_code: ErrorCode,
}

impl CommonResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: ErrorCode::None,
        }
    }

    pub fn failure(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code,
        }
    }
}

/// Progression snapshot of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user_id: String,
    pub username: String,
    pub points: i64,
    pub experience: i64,
    pub level: i64,
    /// Experience at which the next level starts; `None` at max level
    pub next_level_experience: Option<i64>,
    pub signed_today: bool,
    pub continuous_sign_days: i64,
    pub total_sign_days: i64,
    /// `None` when the user never signed in
    pub last_sign_date: Option<NaiveDate>,
    pub activity_score: i64,
}

impl UserInfo {
    /// Build a snapshot, deriving `signed_today` from the stored date
    pub fn from_progression(user: UserProgression, today: NaiveDate) -> Self {
        let last_sign_date = (user.last_sign_date != NEVER_SIGNED).then_some(user.last_sign_date);
        Self {
            next_level_experience: Level::experience_for_next(level_for_experience(user.experience)),
            signed_today: last_sign_date == Some(today),
            user_id: user.user_id,
            username: user.username,
            points: user.points,
            experience: user.experience,
            level: user.level,
            continuous_sign_days: user.continuous_sign_days,
            total_sign_days: user.total_sign_days,
            last_sign_date,
            activity_score: user.activity_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelCount {
    pub level: i64,
    pub user_count: i64,
}

/// Cross-user statistics for admins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub avg_points: f64,
    pub monthly_points_used: i64,
    /// Sorted by level
    pub level_distribution: Vec<LevelCount>,
}
