use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::database::models::*;
use crate::database::DatabaseManager;
use crate::utils::datetime::{parse_db_date, to_db_date};
use crate::utils::logging::log_system_event;

const ACTIVITY_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub daily_counts_reset: u64,
    pub camps_closed: u64,
    pub streaks_reset: u64,
    pub activity_pruned: u64,
}

/// Daily housekeeping, run at most once per local date in `tz`.
///
/// Returns `None` when today's run already happened.
pub async fn run_daily_maintenance(
    db: &DatabaseManager,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Option<MaintenanceReport>, sqlx::Error> {
    let pool = &db.pool;
    let today = now.with_timezone(&tz).date_naive();

    let last_run = SystemStat::get(pool, STAT_LAST_MAINTENANCE_DATE)
        .await?
        .as_deref()
        .and_then(parse_db_date);
    if last_run.is_some_and(|last| last >= today) {
        return Ok(None);
    }
    SystemStat::set(pool, STAT_LAST_MAINTENANCE_DATE, &to_db_date(today), now).await?;

    let yesterday = today.pred_opt().unwrap_or(today);
    let report = MaintenanceReport {
        daily_counts_reset: GroupParticipant::reset_daily_counts(pool).await?,
        camps_closed: Camp::deactivate_expired(pool, now).await?,
        streaks_reset: User::reset_stale_streaks(pool, yesterday).await?,
        activity_pruned: ActivityLog::prune_before(pool, now - Duration::days(ACTIVITY_RETENTION_DAYS)).await?,
    };

    log_system_event("Daily maintenance finished", Some(&format!("{report:?}")));
    Ok(Some(report))
}
