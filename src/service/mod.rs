//! Progression service: the business operations over the ledger
//!
//! Every operation takes the caller's [`CallerIdentity`] explicitly and holds
//! no state between calls. Expected failures (insufficient points, already
//! signed, already liked) come back as a [`CommonResponse`] with
//! `success = false`; only infrastructure problems surface as
//! [`ServiceError`].

mod error;
mod identity;
mod request;
mod response;

use std::sync::Arc;

use tracing::{debug, info, warn};

pub use error::{ErrorClass, ServiceError};
pub use identity::{CallerIdentity, Role, UnknownRole};
pub use request::{AdjustPointsRequest, LikeRequest, SignRequest};
pub use response::{AdminStats, CommonResponse, ErrorCode, LevelCount, UserInfo};

use crate::clock::Clock;
use crate::ledger::{
    LedgerDb, LedgerError, PointsRepository, SqlitePointsRepository, SqliteStatisticsRepository,
    SqliteUserRepository, StatisticsRepository, UserProgression, UserRepository,
};
use crate::progression::{
    Calendar, SIGN_IN_REASON, SignInReward, StreakOutcome, activity_bonus_ratio, apply_sign_in_bonus,
    streak_outcome,
};

/// Orchestrates the repositories for the four business operations and admin stats
#[derive(Clone)]
pub struct ProgressionService {
    users: Arc<dyn UserRepository>,
    points: Arc<dyn PointsRepository>,
    stats: Arc<dyn StatisticsRepository>,
    calendar: Calendar,
    clock: Arc<dyn Clock>,
}

impl ProgressionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        points: Arc<dyn PointsRepository>,
        stats: Arc<dyn StatisticsRepository>,
        calendar: Calendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            points,
            stats,
            calendar,
            clock,
        }
    }

    /// Wire the SQLite repositories over one database, sharing its clock
    pub fn from_db(db: &LedgerDb, calendar: Calendar) -> Self {
        Self::new(
            Arc::new(SqliteUserRepository::new(db.clone())),
            Arc::new(SqlitePointsRepository::new(db.clone())),
            Arc::new(SqliteStatisticsRepository::new(db.clone())),
            calendar,
            db.clock().clone(),
        )
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Add (or deduct) points and experience, with one ledger entry.
    ///
    /// A deduction larger than the balance is answered with
    /// `POINTS_INSUFFICIENT` and changes nothing.
    pub fn adjust_points_and_experience(
        &self,
        caller: &CallerIdentity,
        req: &AdjustPointsRequest,
    ) -> Result<CommonResponse, ServiceError> {
        if req.reason.trim().is_empty() {
            return Err(ServiceError::InvalidArgument("reason must not be empty".into()));
        }
        if req.delta_experience < 0 {
            return Err(ServiceError::InvalidArgument(
                "delta_experience must not be negative".into(),
            ));
        }

        let (user_id, username) = self.resolve_target(caller, req.user_id.as_deref(), "adjust points for")?;
        let user = self
            .users
            .fetch_or_create(user_id, username)
            .map_err(ServiceError::internal("fetch user"))?;

        if req.delta_points < 0 && user.points < -req.delta_points {
            info!(
                user_id,
                balance = user.points,
                requested = -req.delta_points,
                "[points:service] Deduction refused"
            );
            return Ok(insufficient(user.points, -req.delta_points));
        }

        match self
            .points
            .apply_delta(user_id, req.delta_points, req.delta_experience, &req.reason)
        {
            Ok(_) => {}
            // Lost a race against a concurrent deduction after the pre-check
            Err(LedgerError::InsufficientPoints { balance, requested }) => {
                return Ok(insufficient(balance, requested));
            }
            Err(e) => return Err(ServiceError::internal("apply delta")(e)),
        }

        let mut message = format!(
            "adjusted by {:+} points, {:+} experience",
            req.delta_points, req.delta_experience
        );
        if req.delta_experience != 0 {
            let change = self
                .users
                .update_level(user_id)
                .map_err(ServiceError::internal("update level"))?;
            if let Some(change) = change {
                message.push_str(&format!(", level {} -> {}", change.old_level, change.new_level));
            }
        }

        info!(
            user_id,
            delta_points = req.delta_points,
            delta_experience = req.delta_experience,
            reason = %req.reason,
            "[points:service] Adjusted balance"
        );
        Ok(CommonResponse::ok(message))
    }

    /// Progression snapshot of the caller, or of `user_id` when given.
    ///
    /// Reading yourself creates your row on first access; reading someone
    /// else never creates anything.
    pub fn get_user_info(
        &self,
        caller: &CallerIdentity,
        user_id: Option<&str>,
    ) -> Result<UserInfo, ServiceError> {
        let requested = user_id.filter(|id| !id.is_empty()).unwrap_or(caller.user_id.as_str());

        let user = if requested == caller.user_id {
            self.users
                .fetch_or_create(&caller.user_id, &caller.username)
                .map_err(ServiceError::internal("fetch user"))?
        } else {
            self.users
                .get(requested)
                .map_err(ServiceError::internal("get user"))?
                .ok_or_else(|| ServiceError::NotFound(format!("user {requested}")))?
        };

        let today = self.calendar.today(self.clock.now());
        Ok(UserInfo::from_progression(user, today))
    }

    /// Like a post once; its author earns a point
    pub fn process_like(
        &self,
        caller: &CallerIdentity,
        req: &LikeRequest,
    ) -> Result<CommonResponse, ServiceError> {
        if req.post_id.is_empty() || req.target_user_id.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "post_id and target_user_id are required".into(),
            ));
        }

        match self
            .points
            .record_like(&caller.user_id, &req.post_id, &req.target_user_id)
        {
            Ok(_) => Ok(CommonResponse::ok("liked")),
            Err(LedgerError::AlreadyExists { .. }) => {
                debug!(user_id = %caller.user_id, post_id = %req.post_id, "[points:service] Duplicate like");
                Ok(CommonResponse::failure(
                    ErrorCode::AlreadyLiked,
                    "already liked this post",
                ))
            }
            Err(e) => Err(ServiceError::internal("record like")(e)),
        }
    }

    /// Daily sign-in: extends or resets the streak and grants the bonus-scaled reward
    pub fn sign(&self, caller: &CallerIdentity, req: &SignRequest) -> Result<CommonResponse, ServiceError> {
        let (user_id, username) = self.resolve_target(caller, req.user_id.as_deref(), "sign in for")?;
        let user = self
            .users
            .fetch_or_create(user_id, username)
            .map_err(ServiceError::internal("fetch user"))?;

        let today = self.calendar.today(self.clock.now());
        let continuous_days = match streak_outcome(user.last_sign_date, today, user.continuous_sign_days) {
            StreakOutcome::AlreadySignedToday => {
                return Ok(CommonResponse::failure(
                    ErrorCode::AlreadySigned,
                    "already signed in today",
                ));
            }
            StreakOutcome::Signed { continuous_days } => continuous_days,
        };

        let ratio = activity_bonus_ratio(user.activity_score);
        let (points, experience) =
            apply_sign_in_bonus(SignInReward::POINTS, SignInReward::EXPERIENCE, ratio);

        match self
            .users
            .update_sign_in_state(user_id, continuous_days, user.total_sign_days + 1, today)
        {
            Ok(()) => {}
            // Another request signed this user in after our read
            Err(LedgerError::AlreadySigned { .. }) => {
                return Ok(CommonResponse::failure(
                    ErrorCode::AlreadySigned,
                    "already signed in today",
                ));
            }
            Err(e) => return Err(ServiceError::internal("update sign-in state")(e)),
        }
        self.points
            .apply_delta(user_id, points, experience, SIGN_IN_REASON)
            .map_err(ServiceError::internal("apply sign-in reward"))?;
        self.users
            .update_level(user_id)
            .map_err(ServiceError::internal("update level"))?;

        // Best effort: a missed activity bump only affects future bonuses
        if let Err(e) = self.users.update_activity_score(user_id, SignInReward::ACTIVITY) {
            warn!(user_id, error = %e, "[points:service] Failed to update activity score");
        }

        info!(
            user_id,
            continuous_days,
            points,
            experience,
            bonus_percent = ratio.as_percent(),
            "[points:service] Signed in"
        );
        Ok(CommonResponse::ok(sign_message(&user, continuous_days, points, experience)))
    }

    /// Level histogram, average balance and this month's consumption; admins only
    pub fn get_admin_stats(&self, caller: &CallerIdentity) -> Result<AdminStats, ServiceError> {
        if !caller.is_admin() {
            warn!(user_id = %caller.user_id, "[points:service] Non-admin requested admin stats");
            return Err(ServiceError::PermissionDenied("admin role required".into()));
        }

        let level_distribution = self
            .stats
            .level_distribution()
            .map_err(ServiceError::internal("level distribution"))?
            .into_iter()
            .map(|(level, user_count)| LevelCount { level, user_count })
            .collect();
        let avg_points = self
            .stats
            .average_points()
            .map_err(ServiceError::internal("average points"))?;
        let window = self.calendar.month_window(self.clock.now());
        let monthly_points_used = self
            .stats
            .monthly_points_consumed(window)
            .map_err(ServiceError::internal("monthly consumption"))?;

        Ok(AdminStats {
            avg_points,
            monthly_points_used,
            level_distribution,
        })
    }

    /// Target of an operation acting on "a user": the caller unless an admin names someone else
    fn resolve_target<'a>(
        &self,
        caller: &'a CallerIdentity,
        requested: Option<&'a str>,
        action: &str,
    ) -> Result<(&'a str, &'a str), ServiceError> {
        match requested.filter(|id| !id.is_empty()) {
            None => Ok((&caller.user_id, &caller.username)),
            Some(id) if id == caller.user_id => Ok((&caller.user_id, &caller.username)),
            // Seed name for a row created on someone's behalf is their id
            Some(id) if caller.is_admin() => Ok((id, id)),
            Some(id) => Err(ServiceError::PermissionDenied(format!(
                "only admins may {action} user {id}"
            ))),
        }
    }
}

fn insufficient(balance: i64, requested: i64) -> CommonResponse {
    CommonResponse::failure(
        ErrorCode::PointsInsufficient,
        format!("insufficient points: balance {balance}, requested {requested}"),
    )
}

fn sign_message(user: &UserProgression, continuous_days: i64, points: i64, experience: i64) -> String {
    let streak = if continuous_days > 1 {
        format!("{continuous_days}-day streak")
    } else if user.total_sign_days > 0 {
        "streak restarted".to_string()
    } else {
        "first sign-in".to_string()
    };
    format!(
        "signed in ({streak}): +{points} points, +{experience} experience, +{} activity",
        SignInReward::ACTIVITY
    )
}
