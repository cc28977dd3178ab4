//! Statistics queries across all users
//!
//! Read-only; the service only calls these for admin callers.

use std::collections::BTreeMap;

use rusqlite::params;

use super::db::LedgerDb;
use super::error::LedgerError;
use super::StatisticsRepository;
use crate::progression::MonthWindow;

/// SQLite-backed [`StatisticsRepository`]
#[derive(Clone)]
pub struct SqliteStatisticsRepository {
    db: LedgerDb,
}

impl SqliteStatisticsRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }
}

impl StatisticsRepository for SqliteStatisticsRepository {
    fn level_distribution(&self) -> Result<BTreeMap<i64, i64>, LedgerError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT level, COUNT(*) FROM user_progress WHERE deleted_at IS NULL GROUP BY level",
        )?;

        let distribution = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        Ok(distribution)
    }

    fn average_points(&self) -> Result<f64, LedgerError> {
        let conn = self.db.conn();
        // AVG over no rows is NULL
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(points) FROM user_progress WHERE deleted_at IS NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(avg.unwrap_or(0.0))
    }

    fn monthly_points_consumed(&self, window: MonthWindow) -> Result<i64, LedgerError> {
        let conn = self.db.conn();
        let consumed: i64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(-points), 0) FROM point_records
            WHERE points < 0 AND created_at >= ?1 AND created_at < ?2
            "#,
            params![window.start_ms, window.end_ms],
            |r| r.get(0),
        )?;
        Ok(consumed)
    }
}
