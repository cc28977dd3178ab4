//! Operator commands reading the ledger database directly

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use points_ledger::config::Config;
use points_ledger::ledger::{LedgerDb, PointsRepository, SqlitePointsRepository};
use points_ledger::service::{CallerIdentity, ProgressionService, ServiceError};

/// The CLI acts with admin rights on the local database
fn operator() -> CallerIdentity {
    CallerIdentity::admin("points-ledger-cli", "operator")
}

fn open(config: &Config) -> Result<(LedgerDb, ProgressionService)> {
    let db = LedgerDb::open(&config.database_path())?;
    let service = ProgressionService::from_db(&db, config.calendar()?);
    Ok((db, service))
}

fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Show one user's progression snapshot
pub fn user_command(config: &Config, user_id: &str) -> Result<()> {
    let (_db, service) = open(config)?;
    let info = match service.get_user_info(&operator(), Some(user_id)) {
        Ok(info) => info,
        Err(ServiceError::NotFound(_)) => {
            println!("No progression row for user {user_id}.");
            return Ok(());
        }
        Err(e) => return Err(anyhow!(e)),
    };

    println!("User {} ({})\n", info.user_id, info.username);
    println!("  Points:      {}", info.points);
    match info.next_level_experience {
        Some(next) => println!("  Experience:  {} (level {}, next at {})", info.experience, info.level, next),
        None => println!("  Experience:  {} (level {}, max)", info.experience, info.level),
    }
    println!(
        "  Sign-in:     {} day streak, {} total, signed today: {}",
        info.continuous_sign_days,
        info.total_sign_days,
        if info.signed_today { "yes" } else { "no" }
    );
    match info.last_sign_date {
        Some(day) => println!("  Last signed: {day}"),
        None => println!("  Last signed: never"),
    }
    println!("  Activity:    {}", info.activity_score);
    Ok(())
}

/// List a user's most recent ledger entries
pub fn ledger_command(config: &Config, user_id: &str, limit: usize) -> Result<()> {
    let (db, _service) = open(config)?;
    let entries = SqlitePointsRepository::new(db).list_entries(user_id, limit)?;

    if entries.is_empty() {
        println!("No ledger entries for user {user_id}.");
        return Ok(());
    }

    println!("Ledger for {} ({} most recent):\n", user_id, entries.len());
    for entry in entries {
        println!(
            "  #{:<6} {}  {:>+7} pts  {:>+6} xp  {}",
            entry.id,
            format_ms(entry.created_at),
            entry.points,
            entry.experience,
            entry.reason
        );
    }
    Ok(())
}

/// Print the admin statistics
pub fn stats_command(config: &Config) -> Result<()> {
    let (_db, service) = open(config)?;
    let stats = service.get_admin_stats(&operator()).map_err(|e| anyhow!(e))?;

    println!("Average points:          {:.2}", stats.avg_points);
    println!("Points used this month:  {}", stats.monthly_points_used);
    println!("\nLevel distribution:");
    if stats.level_distribution.is_empty() {
        println!("  (no users)");
    }
    for bucket in stats.level_distribution {
        println!("  Level {:>2}: {}", bucket.level, bucket.user_count);
    }
    Ok(())
}
