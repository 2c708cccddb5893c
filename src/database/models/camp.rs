use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

use crate::utils::datetime::{from_db_timestamp, to_db_timestamp};

const CAMP_COLUMNS: &str = "id, group_id, name, description, created_by, start_at, end_at, \
    max_participants, is_active, announcement_message_id, created_at";

/// An admin-defined, dated study camp inside a group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Camp {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub description: String,
    pub created_by: i64,
    pub start_at: String,
    pub end_at: String,
    /// Zero means unlimited.
    pub max_participants: i64,
    pub is_active: bool,
    pub announcement_message_id: Option<i64>,
    pub created_at: String,
}

/// Validated input for a new camp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCamp {
    pub name: String,
    pub description: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_participants: i64,
}

impl Camp {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        from_db_timestamp(&self.start_at)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        from_db_timestamp(&self.end_at)
    }

    /// Whether `at` falls inside the camp's start and end, inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match (self.starts_at(), self.ends_at()) {
            (Some(start), Some(end)) => start <= at && at <= end,
            _ => false,
        }
    }

    /// Active and not yet over. Members may join before the start.
    pub fn is_joinable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at().is_some_and(|end| now <= end)
    }

    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.contains(now)
    }

    pub fn has_capacity_limit(&self) -> bool {
        self.max_participants > 0
    }

    /// Percentage of the camp's duration already elapsed, 0 to 100.
    pub fn progress_percent(&self, now: DateTime<Utc>) -> i64 {
        let (Some(start), Some(end)) = (self.starts_at(), self.ends_at()) else {
            return 0;
        };
        let total = (end - start).num_seconds();
        if total <= 0 {
            return 100;
        }
        let elapsed = (now - start).num_seconds().clamp(0, total);
        elapsed * 100 / total
    }

    /// Whole days left until the end, never negative.
    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        self.ends_at()
            .map(|end| (end - now).num_days().max(0))
            .unwrap_or(0)
    }

    pub async fn create(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        created_by: i64,
        camp: &NewCamp,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO camps (group_id, name, description, created_by, start_at, end_at, max_participants, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(group_id)
        .bind(&camp.name)
        .bind(&camp.description)
        .bind(created_by)
        .bind(to_db_timestamp(&camp.start_at))
        .bind(to_db_timestamp(&camp.end_at))
        .bind(camp.max_participants.max(0))
        .bind(to_db_timestamp(&now))
        .execute(pool)
        .await?;

        Self::find_by_id(pool, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Camp>(&format!("SELECT {CAMP_COLUMNS} FROM camps WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_active_by_group(pool: &sqlx::SqlitePool, group_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Camp>(&format!(
            "SELECT {CAMP_COLUMNS} FROM camps WHERE group_id = ? AND is_active = TRUE ORDER BY start_at"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// Active camps whose date range contains `now`.
    pub async fn find_running(pool: &sqlx::SqlitePool, now: DateTime<Utc>) -> Result<Vec<Self>, sqlx::Error> {
        let now = to_db_timestamp(&now);
        sqlx::query_as::<_, Camp>(&format!(
            "SELECT {CAMP_COLUMNS} FROM camps WHERE is_active = TRUE AND start_at <= ? AND end_at >= ?"
        ))
        .bind(&now)
        .bind(&now)
        .fetch_all(pool)
        .await
    }

    pub async fn set_announcement(pool: &sqlx::SqlitePool, id: i64, message_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE camps SET announcement_message_id = ? WHERE id = ?")
            .bind(message_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Closes every active camp that ended before `now`.
    pub async fn deactivate_expired(pool: &sqlx::SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE camps SET is_active = FALSE WHERE is_active = TRUE AND end_at < ?")
            .bind(to_db_timestamp(&now))
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_active(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM camps WHERE is_active = TRUE")
            .fetch_one(pool)
            .await
    }
}
