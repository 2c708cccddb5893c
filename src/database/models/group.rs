use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

use crate::schedule::ScheduleType;
use crate::utils::datetime::to_db_timestamp;

const GROUP_COLUMNS: &str = "id, telegram_chat_id, title, admin_id, timezone, is_active, \
    morning_enabled, evening_enabled, custom_enabled, motivation_enabled, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub telegram_chat_id: i64,
    pub title: Option<String>,
    pub admin_id: Option<i64>,
    pub timezone: String,
    pub is_active: bool,
    pub morning_enabled: bool,
    pub evening_enabled: bool,
    pub custom_enabled: bool,
    pub motivation_enabled: bool,
    pub created_at: String,
}

impl Group {
    /// The group's timezone, or `fallback` when the stored name is unknown.
    pub fn tz(&self, fallback: Tz) -> Tz {
        self.timezone.parse().unwrap_or(fallback)
    }

    pub fn schedule_enabled(&self, schedule_type: ScheduleType) -> bool {
        match schedule_type {
            ScheduleType::Morning => self.morning_enabled,
            ScheduleType::Evening => self.evening_enabled,
            ScheduleType::Custom => self.custom_enabled,
        }
    }

    pub fn enabled_schedules(&self) -> Vec<ScheduleType> {
        [ScheduleType::Morning, ScheduleType::Evening, ScheduleType::Custom]
            .into_iter()
            .filter(|schedule_type| self.schedule_enabled(*schedule_type))
            .collect()
    }

    pub async fn find_by_chat_id(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE telegram_chat_id = ?"
        ))
        .bind(chat_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Group>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Registers the chat on first use. The first user seen becomes the stored admin.
    pub async fn get_or_create(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
        title: Option<&str>,
        admin_id: Option<i64>,
        timezone: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO groups (telegram_chat_id, title, admin_id, timezone, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(telegram_chat_id) DO UPDATE SET
                title = COALESCE(excluded.title, groups.title),
                admin_id = COALESCE(groups.admin_id, excluded.admin_id),
                is_active = TRUE
            "#,
        )
        .bind(chat_id)
        .bind(title)
        .bind(admin_id)
        .bind(timezone.name())
        .bind(to_db_timestamp(&now))
        .execute(pool)
        .await?;

        Self::find_by_chat_id(pool, chat_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn set_schedule_enabled(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        schedule_type: ScheduleType,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        let column = match schedule_type {
            ScheduleType::Morning => "morning_enabled",
            ScheduleType::Evening => "evening_enabled",
            ScheduleType::Custom => "custom_enabled",
        };
        sqlx::query(&format!("UPDATE groups SET {column} = ? WHERE id = ?"))
            .bind(enabled)
            .bind(group_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_motivation_enabled(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE groups SET motivation_enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(group_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Marks the chat inactive after the bot left or was removed. Returns false for unknown chats.
    pub async fn deactivate(pool: &sqlx::SqlitePool, chat_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE groups SET is_active = FALSE WHERE telegram_chat_id = ? AND is_active = TRUE")
            .bind(chat_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_timezone(pool: &sqlx::SqlitePool, group_id: i64, timezone: Tz) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE groups SET timezone = ? WHERE id = ?")
            .bind(timezone.name())
            .bind(group_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active groups with at least one schedule switched on.
    pub async fn find_with_schedules(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups \
             WHERE is_active = TRUE AND (morning_enabled OR evening_enabled OR custom_enabled)"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_motivation_enabled(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE is_active = TRUE AND motivation_enabled = TRUE"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM groups WHERE is_active = TRUE")
            .fetch_one(pool)
            .await
    }
}
