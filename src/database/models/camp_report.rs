use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::utils::datetime::{to_db_date, to_db_timestamp};

/// Marker for a daily camp report that has gone out.
pub struct CampReport;

impl CampReport {
    /// Claims the report for `report_date`. `false` means it was already sent.
    pub async fn claim(
        pool: &SqlitePool,
        camp_id: i64,
        report_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO camp_reports (camp_id, report_date, sent_at) VALUES (?, ?, ?)")
            .bind(camp_id)
            .bind(to_db_date(report_date))
            .bind(to_db_timestamp(&now))
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
