//! Daily sign-in streak tracking
//!
//! Streaks are computed from the stored last sign-in day and today's date in
//! the reference calendar. Nothing resets `is_signed` on a schedule: a new
//! day is detected purely by date comparison.

use chrono::NaiveDate;

use super::calendar::NEVER_SIGNED;

/// Result of comparing the last sign-in day with today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// The user already signed in today; nothing may change.
    AlreadySignedToday,
    /// A sign-in is allowed and yields this streak length.
    Signed { continuous_days: i64 },
}

impl StreakOutcome {
    pub fn is_already_signed(&self) -> bool {
        matches!(self, Self::AlreadySignedToday)
    }

    /// Streak length after signing in (None when already signed)
    pub fn continuous_days(&self) -> Option<i64> {
        match self {
            Self::AlreadySignedToday => None,
            Self::Signed { continuous_days } => Some(*continuous_days),
        }
    }
}

/// Decide what a sign-in today does to a streak of `previous_streak` days.
///
/// A last sign-in day later than today (clock moved backwards, or the
/// reference offset changed) counts as already signed so no reward is paid
/// twice for one calendar day.
pub fn streak_outcome(last_sign_date: NaiveDate, today: NaiveDate, previous_streak: i64) -> StreakOutcome {
    if last_sign_date >= today && last_sign_date != NEVER_SIGNED {
        return StreakOutcome::AlreadySignedToday;
    }

    let continues = last_sign_date != NEVER_SIGNED && today.pred_opt() == Some(last_sign_date);
    let continuous_days = if continues {
        previous_streak.max(0) + 1
    } else {
        1 // Reset
    };

    StreakOutcome::Signed { continuous_days }
}
