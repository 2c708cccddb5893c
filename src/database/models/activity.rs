use chrono::{DateTime, Utc};
use sqlx::Sqlite;

use crate::utils::datetime::to_db_timestamp;

/// Append-only trail of what users did.
pub struct ActivityLog;

impl ActivityLog {
    pub async fn record<'e, E>(
        executor: E,
        user_id: i64,
        activity_type: &str,
        details: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO activity_log (user_id, activity_type, details, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(activity_type)
            .bind(details)
            .bind(to_db_timestamp(&now))
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count_for_user(pool: &sqlx::SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activity_log WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn prune_before(pool: &sqlx::SqlitePool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM activity_log WHERE created_at < ?")
            .bind(to_db_timestamp(&cutoff))
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
