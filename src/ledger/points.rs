//! Points repository - ledger entries, balance updates and like rewards

use rusqlite::{OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info, warn};

use super::db::LedgerDb;
use super::error::LedgerError;
use super::models::{LikeEvent, PointLedgerEntry};
use super::PointsRepository;
use crate::progression::LIKE_REWARD_POINTS;

/// SQLite-backed [`PointsRepository`]
#[derive(Clone)]
pub struct SqlitePointsRepository {
    db: LedgerDb,
}

impl SqlitePointsRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }
}

impl PointsRepository for SqlitePointsRepository {
    fn apply_delta(
        &self,
        user_id: &str,
        delta_points: i64,
        delta_experience: i64,
        reason: &str,
    ) -> Result<PointLedgerEntry, LedgerError> {
        let now = self.db.now_ms();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            r#"INSERT INTO point_records (user_id, points, experience, reason, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![user_id, delta_points, delta_experience, reason, now],
        )?;
        let entry_id = tx.last_insert_rowid();

        // Deductions only apply while the balance stays non-negative
        let updated = tx.execute(
            r#"
            UPDATE user_progress SET
                points = points + ?2,
                experience = experience + ?3,
                updated_at = ?4
            WHERE user_id = ?1 AND (?2 >= 0 OR points + ?2 >= 0)
            "#,
            params![user_id, delta_points, delta_experience, now],
        )?;

        if updated == 0 {
            let balance: Option<i64> = tx
                .query_row(
                    "SELECT points FROM user_progress WHERE user_id = ?1",
                    params![user_id],
                    |r| r.get(0),
                )
                .optional()?;
            // Dropping `tx` here rolls back the ledger insert as well
            return Err(match balance {
                Some(balance) => LedgerError::InsufficientPoints {
                    balance,
                    requested: -delta_points,
                },
                None => LedgerError::NotFound(user_id.to_string()),
            });
        }

        tx.commit()?;
        debug!(user_id, delta_points, delta_experience, reason, "[points:db] Applied ledger delta");

        Ok(PointLedgerEntry {
            id: entry_id,
            user_id: user_id.to_string(),
            points: delta_points,
            experience: delta_experience,
            reason: reason.to_string(),
            created_at: now,
        })
    }

    fn record_like(
        &self,
        user_id: &str,
        post_id: &str,
        target_user_id: &str,
    ) -> Result<LikeEvent, LedgerError> {
        let now = self.db.now_ms();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let already_liked = || LedgerError::AlreadyExists {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
        };

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM like_records WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
            |r| r.get(0),
        )?;
        if existing > 0 {
            return Err(already_liked());
        }

        tx.execute(
            r#"INSERT INTO like_records (user_id, post_id, target_user_id, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![user_id, post_id, target_user_id, now],
        )
        .map_err(|e| {
            if LedgerError::is_constraint_violation(&e) {
                already_liked()
            } else {
                e.into()
            }
        })?;
        let like_id = tx.last_insert_rowid();

        // The like reward is a direct balance bump; it has no ledger entry.
        let rewarded = tx.execute(
            "UPDATE user_progress SET points = points + ?2, updated_at = ?3 WHERE user_id = ?1",
            params![target_user_id, LIKE_REWARD_POINTS, now],
        )?;

        tx.commit()?;
        if rewarded == 0 {
            warn!(
                user_id,
                post_id,
                target_user_id,
                "[points:db] Recorded like for unknown target, no reward"
            );
        } else {
            info!(user_id, post_id, target_user_id, "[points:db] Recorded like");
        }

        Ok(LikeEvent {
            id: like_id,
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            target_user_id: target_user_id.to_string(),
            created_at: now,
        })
    }

    fn list_entries(&self, user_id: &str, limit: usize) -> Result<Vec<PointLedgerEntry>, LedgerError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, points, experience, reason, created_at
            FROM point_records WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(PointLedgerEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    points: row.get(2)?,
                    experience: row.get(3)?,
                    reason: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }
}
