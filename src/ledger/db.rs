//! SQLite database connection and schema management for the ledger
//!
//! Manages the ledger database (`~/.points-ledger/ledger.db` by default) with
//! automatic schema migration. Every handle cloned from a [`LedgerDb`] shares
//! one connection; separate `open` calls on the same file get separate
//! connections that serialize through SQLite's own locking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};

/// How long a writer waits for another connection's transaction before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper shared by the repositories
#[derive(Clone)]
pub struct LedgerDb {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl LedgerDb {
    /// Open or create the ledger database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open or create the ledger database, stamping records with `clock`
    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open ledger db: {}", path.display()))?;

        // Wait on locks held by other connections before touching the schema
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            clock,
        };
        db.init_schema()?;
        info!("[points:db] Ledger database ready at {}", path.display());
        Ok(db)
    }

    /// Lock the shared connection.
    ///
    /// A panic while holding the lock cannot leave a half-applied write
    /// behind (an uncommitted transaction rolls back when dropped), so a
    /// poisoned lock is recovered instead of propagated.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current time in Unix milliseconds, from the database's clock
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create ledger schema")?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )?;
        debug!("[points:db] Schema version {}", version);

        // Migration 2: activity score on user rows created before it existed
        if version < 2 {
            let has_activity_score: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('user_progress') WHERE name = 'activity_score'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)?;

            if !has_activity_score {
                conn.execute_batch(
                    "ALTER TABLE user_progress ADD COLUMN activity_score INTEGER NOT NULL DEFAULT 0;",
                )?;
                info!("[points:db] Added activity_score column");
            }

            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }
}

/// SQL schema for the ledger database
const SCHEMA_SQL: &str = r#"
-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);

-- One progression row per user
CREATE TABLE IF NOT EXISTS user_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL,
    points INTEGER NOT NULL DEFAULT 0,
    experience INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    is_signed INTEGER NOT NULL DEFAULT 0,
    continuous_sign_days INTEGER NOT NULL DEFAULT 0,
    total_sign_days INTEGER NOT NULL DEFAULT 0,
    last_sign_date TEXT NOT NULL DEFAULT '1970-01-01',
    activity_score INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER                          -- Reserved for soft delete
);
CREATE INDEX IF NOT EXISTS idx_user_level ON user_progress(level);

-- Point/experience ledger (append-only)
CREATE TABLE IF NOT EXISTS point_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    points INTEGER NOT NULL,
    experience INTEGER NOT NULL,
    reason TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_point_user ON point_records(user_id);
CREATE INDEX IF NOT EXISTS idx_point_created_at ON point_records(created_at);

-- Like events (append-only, one per liker and post)
CREATE TABLE IF NOT EXISTS like_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    post_id TEXT NOT NULL,
    target_user_id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (user_id, post_id)
);
CREATE INDEX IF NOT EXISTS idx_like_target ON like_records(target_user_id);
"#;
