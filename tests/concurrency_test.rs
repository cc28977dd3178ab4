//! Concurrent access through separate SQLite connections on one file

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use common::ledger;
use points_ledger::clock::SystemClock;
use points_ledger::ledger::{
    LedgerDb, LedgerError, LevelChange, PointsRepository, SqlitePointsRepository,
    SqliteStatisticsRepository, SqliteUserRepository, UserProgression, UserRepository,
};
use points_ledger::progression::{Calendar, SEED_POINTS, SIGN_IN_REASON};
use points_ledger::service::{
    AdjustPointsRequest, CallerIdentity, ErrorCode, ProgressionService, SignRequest,
};

const THREADS: usize = 8;

/// One connection per thread, all opened before any thread starts
fn connections(t: &common::TestLedger) -> Vec<LedgerDb> {
    (0..THREADS)
        .map(|_| LedgerDb::open_with_clock(&t.db_path(), Arc::new(SystemClock)).unwrap())
        .collect()
}

#[test]
fn test_concurrent_first_access_creates_one_row() {
    let t = ledger();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = connections(&t)
        .into_iter()
        .enumerate()
        .map(|(n, db)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let users = SqliteUserRepository::new(db);
                barrier.wait();
                users.fetch_or_create("racer", &format!("name-{n}")).unwrap()
            })
        })
        .collect();

    let rows: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(t.count("SELECT COUNT(*) FROM user_progress WHERE user_id = 'racer'"), 1);
    // Every caller saw the same row
    assert!(rows.iter().all(|r| r.id == rows[0].id && r.username == rows[0].username));
    assert!(rows.iter().all(|r| r.points == SEED_POINTS));
}

#[test]
fn test_concurrent_duplicate_likes_reward_once() {
    let t = ledger();
    SqliteUserRepository::new(t.db.clone())
        .fetch_or_create("author", "author")
        .unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = connections(&t)
        .into_iter()
        .map(|db| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let points = SqlitePointsRepository::new(db);
                barrier.wait();
                points.record_like("fan", "post-1", "author")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::AlreadyExists { .. })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(duplicates, THREADS - 1);
    assert_eq!(t.count("SELECT COUNT(*) FROM like_records"), 1);
    assert_eq!(
        t.count("SELECT points FROM user_progress WHERE user_id = 'author'"),
        SEED_POINTS + 1
    );
}

#[test]
fn test_concurrent_deductions_never_overdraw() {
    let t = ledger();
    let spender = CallerIdentity::user("spender", "spender");
    t.service.get_user_info(&spender, None).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    // 8 x 200 against a 1200 balance: exactly 6 can succeed
    let handles: Vec<_> = connections(&t)
        .into_iter()
        .map(|db| {
            let barrier = Arc::clone(&barrier);
            let spender = spender.clone();
            thread::spawn(move || {
                let service = ProgressionService::from_db(&db, Calendar::utc());
                let req = AdjustPointsRequest {
                    user_id: None,
                    delta_points: -200,
                    delta_experience: 0,
                    reason: "shop".into(),
                };
                barrier.wait();
                service.adjust_points_and_experience(&spender, &req).unwrap()
            })
        })
        .collect();

    let responses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let succeeded = responses.iter().filter(|r| r.success).count();
    assert_eq!(succeeded, 6);
    assert!(
        responses
            .iter()
            .filter(|r| !r.success)
            .all(|r| r.error_code == ErrorCode::PointsInsufficient)
    );

    assert_eq!(
        t.count("SELECT points FROM user_progress WHERE user_id = 'spender'"),
        0
    );
    assert_eq!(
        t.count("SELECT COUNT(*) FROM point_records WHERE user_id = 'spender'"),
        6
    );
}

/// Holds every caller at a barrier after its read, so all of them act on the
/// same pre-sign-in row before any write lands
struct ReadThenWait {
    inner: SqliteUserRepository,
    barrier: Arc<Barrier>,
}

impl UserRepository for ReadThenWait {
    fn fetch_or_create(&self, user_id: &str, username: &str) -> Result<UserProgression, LedgerError> {
        let user = self.inner.fetch_or_create(user_id, username)?;
        self.barrier.wait();
        Ok(user)
    }

    fn get(&self, user_id: &str) -> Result<Option<UserProgression>, LedgerError> {
        self.inner.get(user_id)
    }

    fn update_sign_in_state(
        &self,
        user_id: &str,
        continuous_days: i64,
        total_days: i64,
        signed_on: NaiveDate,
    ) -> Result<(), LedgerError> {
        self.inner
            .update_sign_in_state(user_id, continuous_days, total_days, signed_on)
    }

    fn update_level(&self, user_id: &str) -> Result<Option<LevelChange>, LedgerError> {
        self.inner.update_level(user_id)
    }

    fn update_activity_score(&self, user_id: &str, delta: i64) -> Result<(), LedgerError> {
        self.inner.update_activity_score(user_id, delta)
    }
}

#[test]
fn test_concurrent_sign_in_rewards_once() {
    let t = ledger();
    let signer = CallerIdentity::user("signer", "signer");
    t.service.get_user_info(&signer, None).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = connections(&t)
        .into_iter()
        .map(|db| {
            let barrier = Arc::clone(&barrier);
            let signer = signer.clone();
            thread::spawn(move || {
                let users = ReadThenWait {
                    inner: SqliteUserRepository::new(db.clone()),
                    barrier,
                };
                let service = ProgressionService::new(
                    Arc::new(users),
                    Arc::new(SqlitePointsRepository::new(db.clone())),
                    Arc::new(SqliteStatisticsRepository::new(db.clone())),
                    Calendar::utc(),
                    db.clock().clone(),
                );
                service.sign(&signer, &SignRequest::default()).unwrap()
            })
        })
        .collect();

    let responses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(responses.iter().filter(|r| r.success).count(), 1);
    assert!(
        responses
            .iter()
            .filter(|r| !r.success)
            .all(|r| r.error_code == ErrorCode::AlreadySigned)
    );

    let entries = t.entries("signer");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, SIGN_IN_REASON);
    assert_eq!(
        t.count("SELECT points FROM user_progress WHERE user_id = 'signer'"),
        SEED_POINTS + entries[0].points
    );
    assert_eq!(
        t.count("SELECT total_sign_days FROM user_progress WHERE user_id = 'signer'"),
        1
    );
}

#[test]
fn test_shared_handle_across_threads() {
    let t = ledger();
    let users = SqliteUserRepository::new(t.db.clone());
    users.fetch_or_create("shared", "shared").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let points = SqlitePointsRepository::new(t.db.clone());
            thread::spawn(move || {
                for _ in 0..10 {
                    points.apply_delta("shared", 1, 1, "tick").unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let user = users.get("shared").unwrap().unwrap();
    assert_eq!(user.points, SEED_POINTS + (THREADS as i64) * 10);
    assert_eq!(user.experience, (THREADS as i64) * 10);
    assert_eq!(t.entries("shared").len(), THREADS * 10);
}
