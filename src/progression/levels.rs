//! Experience → level table
//!
//! Levels are never stored independently of experience: the user repository
//! recomputes them through [`level_for_experience`] after every experience
//! change.

/// Level definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub level: i64,
    pub experience_required: i64,
}

/// All level definitions (must be sorted by level)
pub static LEVELS: &[Level] = &[
    Level { level: 1, experience_required: 0 },
    Level { level: 2, experience_required: 100 },
    Level { level: 3, experience_required: 500 },
    Level { level: 4, experience_required: 1_000 },
    Level { level: 5, experience_required: 2_000 },
    Level { level: 6, experience_required: 5_000 },
    Level { level: 7, experience_required: 10_000 },
    Level { level: 8, experience_required: 18_000 },
    Level { level: 9, experience_required: 30_000 },
    Level { level: 10, experience_required: 50_000 },
];

impl Level {
    /// Level reached with the given experience.
    ///
    /// Negative experience cannot happen through the service, but the table
    /// still answers level 1 for it so the mapping stays total.
    pub fn for_experience(experience: i64) -> &'static Level {
        LEVELS
            .iter()
            .rev()
            .find(|l| experience >= l.experience_required)
            .unwrap_or(&LEVELS[0])
    }

    /// Experience needed to reach the level after `current_level` (None at max level)
    pub fn experience_for_next(current_level: i64) -> Option<i64> {
        LEVELS
            .iter()
            .find(|l| l.level == current_level + 1)
            .map(|l| l.experience_required)
    }
}

/// Shorthand for `Level::for_experience(experience).level`
pub fn level_for_experience(experience: i64) -> i64 {
    Level::for_experience(experience).level
}
