//! Shared test utilities for ledger integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use points_ledger::clock::FixedClock;
use points_ledger::ledger::{LedgerDb, PointLedgerEntry, PointsRepository, SqlitePointsRepository};
use points_ledger::progression::Calendar;
use points_ledger::service::{CallerIdentity, ProgressionService};

/// A ledger database in a temp dir, with a pinned clock and a service over it
pub struct TestLedger {
    pub dir: TempDir,
    pub clock: Arc<FixedClock>,
    pub db: LedgerDb,
    pub service: ProgressionService,
}

impl TestLedger {
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("ledger.db")
    }

    /// Set columns of a user row directly, e.g. `"experience = 95"`
    pub fn set_user(&self, user_id: &str, assignments: &str) {
        let updated = self
            .db
            .conn()
            .execute(
                &format!("UPDATE user_progress SET {assignments} WHERE user_id = ?1"),
                [user_id],
            )
            .expect("Failed to update user row");
        assert_eq!(updated, 1, "no row for user {user_id}");
    }

    /// All ledger entries of a user, newest first
    pub fn entries(&self, user_id: &str) -> Vec<PointLedgerEntry> {
        SqlitePointsRepository::new(self.db.clone())
            .list_entries(user_id, usize::MAX)
            .expect("Failed to list ledger entries")
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.db
            .conn()
            .query_row(sql, [], |r| r.get(0))
            .expect("Failed to run count query")
    }
}

/// Ledger whose clock starts at `now`, days counted in UTC
pub fn ledger_at(now: DateTime<Utc>) -> TestLedger {
    ledger_with_calendar(now, Calendar::utc())
}

pub fn ledger_with_calendar(now: DateTime<Utc>, calendar: Calendar) -> TestLedger {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(FixedClock::new(now));
    let db = LedgerDb::open_with_clock(&dir.path().join("ledger.db"), clock.clone())
        .expect("Failed to open ledger db");
    let service = ProgressionService::from_db(&db, calendar);
    TestLedger {
        dir,
        clock,
        db,
        service,
    }
}

/// 2024-06-10 09:00 UTC
pub fn ledger() -> TestLedger {
    ledger_at(utc(2024, 6, 10, 9, 0))
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn alice() -> CallerIdentity {
    CallerIdentity::user("1001", "alice")
}

pub fn bob() -> CallerIdentity {
    CallerIdentity::user("1002", "bob")
}

pub fn admin() -> CallerIdentity {
    CallerIdentity::admin("1", "root")
}
