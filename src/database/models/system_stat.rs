use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::utils::datetime::to_db_timestamp;

pub const STAT_MESSAGES_SENT: &str = "messages_sent";
pub const STAT_LAST_MAINTENANCE_DATE: &str = "last_maintenance_date";

/// Key/value counters and markers kept across restarts.
pub struct SystemStat;

impl SystemStat {
    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM system_stats WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_count(pool: &SqlitePool, key: &str) -> Result<i64, sqlx::Error> {
        Ok(Self::get(pool, key)
            .await?
            .and_then(|value| value.parse().ok())
            .unwrap_or(0))
    }

    pub async fn set(pool: &SqlitePool, key: &str, value: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO system_stats (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(to_db_timestamp(&now))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Adds `by` to a numeric counter, creating it at `by`.
    pub async fn increment(pool: &SqlitePool, key: &str, by: i64, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO system_stats (key, value, updated_at) VALUES (?, CAST(? AS TEXT), ?)
            ON CONFLICT(key) DO UPDATE SET
                value = CAST(CAST(system_stats.value AS INTEGER) + ? AS TEXT),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(by)
        .bind(to_db_timestamp(&now))
        .bind(by)
        .execute(pool)
        .await?;
        Ok(())
    }
}
