//! Progression rules: levels, sign-in streaks and reward bonuses
//!
//! Everything in this module is pure. The service and the user repository
//! consult these functions; none of them touch the database or the clock.

mod calendar;
mod levels;
mod rewards;
mod streaks;

pub use calendar::{Calendar, MonthWindow, NEVER_SIGNED, format_day, parse_day};
pub use levels::{LEVELS, Level, level_for_experience};
pub use rewards::{
    BonusRatio, LIKE_REWARD_POINTS, SEED_POINTS, SIGN_IN_REASON, SignInReward,
    activity_bonus_ratio, apply_sign_in_bonus,
};
pub use streaks::{StreakOutcome, streak_outcome};
