//! Reward amounts and activity-based bonuses

/// Points granted to a user row when it is first created
pub const SEED_POINTS: i64 = 1200;

/// Points granted to the author of a liked post
pub const LIKE_REWARD_POINTS: i64 = 1;

/// Ledger reason written for the daily sign-in reward
pub const SIGN_IN_REASON: &str = "daily sign-in";

/// Base rewards for a daily sign-in
pub struct SignInReward;

impl SignInReward {
    pub const POINTS: i64 = 50;
    pub const EXPERIENCE: i64 = 10;
    /// Activity score is not scaled by the bonus
    pub const ACTIVITY: i64 = 5;
}

/// Bonus ratio in whole percent (10 = +10%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct BonusRatio(u32);

impl BonusRatio {
    pub const NONE: BonusRatio = BonusRatio(0);

    pub const fn percent(percent: u32) -> Self {
        Self(percent)
    }

    pub fn as_percent(&self) -> u32 {
        self.0
    }

    /// `base + trunc(base * ratio)`, kept in integer arithmetic
    pub fn apply(&self, base: i64) -> i64 {
        base + base * i64::from(self.0) / 100
    }
}

/// Bonus earned by accumulated activity score
pub fn activity_bonus_ratio(activity_score: i64) -> BonusRatio {
    match activity_score {
        s if s >= 10_000 => BonusRatio::percent(50),
        s if s >= 5_000 => BonusRatio::percent(30),
        s if s >= 2_000 => BonusRatio::percent(20),
        s if s >= 500 => BonusRatio::percent(10),
        _ => BonusRatio::NONE,
    }
}

/// Apply a bonus to the base sign-in points and experience
pub fn apply_sign_in_bonus(base_points: i64, base_experience: i64, ratio: BonusRatio) -> (i64, i64) {
    (ratio.apply(base_points), ratio.apply(base_experience))
}
