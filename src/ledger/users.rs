//! User repository - fetch-or-create and per-user progression updates

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};

use super::db::LedgerDb;
use super::error::LedgerError;
use super::models::{LevelChange, UserProgression};
use super::UserRepository;
use crate::progression::{NEVER_SIGNED, SEED_POINTS, format_day, level_for_experience, parse_day};

const USER_COLUMNS: &str = "id, user_id, username, points, experience, level, is_signed, \
     continuous_sign_days, total_sign_days, last_sign_date, activity_score, created_at, updated_at";

/// SQLite-backed [`UserRepository`]
#[derive(Clone)]
pub struct SqliteUserRepository {
    db: LedgerDb,
}

impl SqliteUserRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserProgression> {
    let last_sign_date: String = row.get(9)?;
    Ok(UserProgression {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        points: row.get(3)?,
        experience: row.get(4)?,
        level: row.get(5)?,
        is_signed: row.get(6)?,
        continuous_sign_days: row.get(7)?,
        total_sign_days: row.get(8)?,
        last_sign_date: parse_day(&last_sign_date).unwrap_or(NEVER_SIGNED),
        activity_score: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn select_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<UserProgression>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM user_progress WHERE user_id = ?1"),
        params![user_id],
        row_to_user,
    )
    .optional()
}

impl UserRepository for SqliteUserRepository {
    fn fetch_or_create(&self, user_id: &str, username: &str) -> Result<UserProgression, LedgerError> {
        let now = self.db.now_ms();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Insert-if-absent then re-read: a racing creator makes this a no-op
        // instead of a duplicate row or a constraint error.
        let inserted = tx.execute(
            r#"
            INSERT INTO user_progress
                (user_id, username, points, experience, level, is_signed,
                 continuous_sign_days, total_sign_days, last_sign_date, activity_score,
                 created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, 1, 0, 0, 0, ?4, 0, ?5, ?5)
            ON CONFLICT(user_id) DO NOTHING
            "#,
            params![user_id, username, SEED_POINTS, format_day(NEVER_SIGNED), now],
        )?;

        let user = select_user(&tx, user_id)?
            .ok_or_else(|| LedgerError::NotFound(user_id.to_string()))?;
        tx.commit()?;

        if inserted > 0 {
            info!(user_id, username, "[points:db] Created progression row with seed balance");
        }
        Ok(user)
    }

    fn get(&self, user_id: &str) -> Result<Option<UserProgression>, LedgerError> {
        let conn = self.db.conn();
        Ok(select_user(&conn, user_id)?)
    }

    fn update_sign_in_state(
        &self,
        user_id: &str,
        continuous_days: i64,
        total_days: i64,
        signed_on: NaiveDate,
    ) -> Result<(), LedgerError> {
        let now = self.db.now_ms();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            r#"
            UPDATE user_progress SET
                is_signed = 1,
                continuous_sign_days = ?2,
                total_sign_days = ?3,
                last_sign_date = ?4,
                updated_at = ?5
            WHERE user_id = ?1 AND last_sign_date < ?4
            "#,
            params![user_id, continuous_days, total_days, format_day(signed_on), now],
        )?;

        if updated == 0 {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM user_progress WHERE user_id = ?1",
                    params![user_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            return Err(if exists {
                LedgerError::AlreadySigned {
                    user_id: user_id.to_string(),
                    day: signed_on,
                }
            } else {
                LedgerError::NotFound(user_id.to_string())
            });
        }

        tx.commit()?;
        Ok(())
    }

    fn update_level(&self, user_id: &str) -> Result<Option<LevelChange>, LedgerError> {
        let now = self.db.now_ms();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (experience, stored_level): (i64, i64) = tx
            .query_row(
                "SELECT experience, level FROM user_progress WHERE user_id = ?1",
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| LedgerError::NotFound(user_id.to_string()))?;

        let new_level = level_for_experience(experience);
        if new_level == stored_level {
            debug!(user_id, level = new_level, "[points:db] Level unchanged");
            return Ok(None);
        }

        tx.execute(
            "UPDATE user_progress SET level = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, new_level, now],
        )?;
        tx.commit()?;

        info!(user_id, old_level = stored_level, new_level, "[points:db] Level changed");
        Ok(Some(LevelChange {
            old_level: stored_level,
            new_level,
        }))
    }

    fn update_activity_score(&self, user_id: &str, delta: i64) -> Result<(), LedgerError> {
        let now = self.db.now_ms();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            r#"
            UPDATE user_progress SET
                activity_score = MAX(0, activity_score + ?2),
                updated_at = ?3
            WHERE user_id = ?1
            "#,
            params![user_id, delta, now],
        )?;

        if updated == 0 {
            return Err(LedgerError::NotFound(user_id.to_string()));
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> (tempfile::TempDir, LedgerDb, SqliteUserRepository) {
        let dir = tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("ledger.db")).unwrap();
        let repo = SqliteUserRepository::new(db.clone());
        (dir, db, repo)
    }

    #[test]
    fn test_fetch_or_create_seeds_new_user() {
        let (_dir, _db, repo) = repo();
        let user = repo.fetch_or_create("42", "alice").unwrap();

        assert_eq!(user.user_id, "42");
        assert_eq!(user.username, "alice");
        assert_eq!(user.points, SEED_POINTS);
        assert_eq!(user.experience, 0);
        assert_eq!(user.level, 1);
        assert_eq!(user.continuous_sign_days, 0);
        assert_eq!(user.total_sign_days, 0);
        assert_eq!(user.last_sign_date, NEVER_SIGNED);
        assert_eq!(user.activity_score, 0);
        assert!(!user.is_signed);
    }

    #[test]
    fn test_fetch_or_create_returns_existing_row() {
        let (_dir, db, repo) = repo();
        let first = repo.fetch_or_create("42", "alice").unwrap();
        // A different seed name must not overwrite the stored row
        let second = repo.fetch_or_create("42", "mallory").unwrap();

        assert_eq!(first, second);
        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM user_progress", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_get_does_not_create() {
        let (_dir, _db, repo) = repo();
        assert!(repo.get("nobody").unwrap().is_none());
        assert!(repo.get("nobody").unwrap().is_none());
    }

    #[test]
    fn test_update_sign_in_state() {
        let (_dir, _db, repo) = repo();
        repo.fetch_or_create("42", "alice").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        repo.update_sign_in_state("42", 3, 9, day).unwrap();

        let user = repo.get("42").unwrap().unwrap();
        assert!(user.is_signed);
        assert_eq!(user.continuous_sign_days, 3);
        assert_eq!(user.total_sign_days, 9);
        assert_eq!(user.last_sign_date, day);
    }

    #[test]
    fn test_update_sign_in_state_missing_user() {
        let (_dir, _db, repo) = repo();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = repo.update_sign_in_state("ghost", 1, 1, day).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_sign_in_state_refuses_same_day_twice() {
        let (_dir, _db, repo) = repo();
        repo.fetch_or_create("42", "alice").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        repo.update_sign_in_state("42", 1, 1, day).unwrap();
        let err = repo.update_sign_in_state("42", 1, 1, day).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySigned { day: d, .. } if d == day));

        // An earlier day is refused as well; the stored state is untouched
        let earlier = day.pred_opt().unwrap();
        assert!(matches!(
            repo.update_sign_in_state("42", 5, 5, earlier),
            Err(LedgerError::AlreadySigned { .. })
        ));
        let user = repo.get("42").unwrap().unwrap();
        assert_eq!(user.total_sign_days, 1);
        assert_eq!(user.last_sign_date, day);

        repo.update_sign_in_state("42", 2, 2, day.succ_opt().unwrap()).unwrap();
        assert_eq!(repo.get("42").unwrap().unwrap().continuous_sign_days, 2);
    }

    #[test]
    fn test_update_level_only_writes_on_change() {
        let (_dir, db, repo) = repo();
        repo.fetch_or_create("42", "alice").unwrap();

        assert_eq!(repo.update_level("42").unwrap(), None);

        db.conn()
            .execute("UPDATE user_progress SET experience = 105 WHERE user_id = '42'", [])
            .unwrap();
        assert_eq!(
            repo.update_level("42").unwrap(),
            Some(LevelChange { old_level: 1, new_level: 2 })
        );
        assert_eq!(repo.get("42").unwrap().unwrap().level, 2);

        // Recompute still runs, but nothing changes the second time
        assert_eq!(repo.update_level("42").unwrap(), None);
    }

    #[test]
    fn test_update_level_missing_user() {
        let (_dir, _db, repo) = repo();
        assert!(repo.update_level("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_activity_score_is_additive() {
        let (_dir, _db, repo) = repo();
        repo.fetch_or_create("42", "alice").unwrap();

        repo.update_activity_score("42", 5).unwrap();
        repo.update_activity_score("42", 5).unwrap();
        assert_eq!(repo.get("42").unwrap().unwrap().activity_score, 10);

        repo.update_activity_score("42", -50).unwrap();
        assert_eq!(repo.get("42").unwrap().unwrap().activity_score, 0);

        assert!(repo.update_activity_score("ghost", 5).unwrap_err().is_not_found());
    }
}
