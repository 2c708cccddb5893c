use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

use crate::schedule::ParticipationWindow;
use crate::utils::datetime::{from_db_timestamp, to_db_timestamp};

const CAMP_TASK_COLUMNS: &str = "id, camp_id, title, description, scheduled_at, points, deadline_minutes, \
    status, sent_at, message_id, created_at";

/// Lifecycle of a camp task. Only `scheduled` tasks can be claimed for sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampTaskStatus {
    Scheduled,
    Sending,
    Sent,
    Failed,
    Missed,
    Skipped,
}

impl CampTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampTaskStatus::Scheduled => "scheduled",
            CampTaskStatus::Sending => "sending",
            CampTaskStatus::Sent => "sent",
            CampTaskStatus::Failed => "failed",
            CampTaskStatus::Missed => "missed",
            CampTaskStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampTask {
    pub id: i64,
    pub camp_id: i64,
    pub title: String,
    pub description: String,
    pub scheduled_at: String,
    pub points: i64,
    pub deadline_minutes: i64,
    pub status: String,
    pub sent_at: Option<String>,
    pub message_id: Option<i64>,
    pub created_at: String,
}

/// Validated input for a new camp task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampTask {
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub points: i64,
    pub deadline_minutes: i64,
}

impl CampTask {
    pub fn is_sent(&self) -> bool {
        self.status == CampTaskStatus::Sent.as_str()
    }

    pub fn scheduled_time(&self) -> Option<DateTime<Utc>> {
        from_db_timestamp(&self.scheduled_at)
    }

    pub fn window(&self) -> Option<ParticipationWindow> {
        let opened_at = from_db_timestamp(self.sent_at.as_deref()?)?;
        Some(ParticipationWindow::new(opened_at, self.deadline_minutes))
    }

    pub async fn create(
        pool: &sqlx::SqlitePool,
        camp_id: i64,
        task: &NewCampTask,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO camp_tasks (camp_id, title, description, scheduled_at, points, deadline_minutes, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(camp_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(to_db_timestamp(&task.scheduled_at))
        .bind(task.points)
        .bind(task.deadline_minutes)
        .bind(CampTaskStatus::Scheduled.as_str())
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
        sqlx::query_as::<_, CampTask>(&format!("SELECT {CAMP_TASK_COLUMNS} FROM camp_tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Unsent tasks scheduled within `[from, to]`, oldest first.
    pub async fn find_due(
        pool: &sqlx::SqlitePool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CampTask>(&format!(
            "SELECT {CAMP_TASK_COLUMNS} FROM camp_tasks \
             WHERE status = ? AND scheduled_at >= ? AND scheduled_at <= ? ORDER BY scheduled_at, id"
        ))
        .bind(CampTaskStatus::Scheduled.as_str())
        .bind(to_db_timestamp(&from))
        .bind(to_db_timestamp(&to))
        .fetch_all(pool)
        .await
    }

    pub async fn find_for_camp(pool: &sqlx::SqlitePool, camp_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CampTask>(&format!(
            "SELECT {CAMP_TASK_COLUMNS} FROM camp_tasks WHERE camp_id = ? ORDER BY scheduled_at, id"
        ))
        .bind(camp_id)
        .fetch_all(pool)
        .await
    }

    /// Tasks of a camp still waiting to be sent within `[from, to)`.
    pub async fn find_scheduled_between(
        pool: &sqlx::SqlitePool,
        camp_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CampTask>(&format!(
            "SELECT {CAMP_TASK_COLUMNS} FROM camp_tasks \
             WHERE camp_id = ? AND status = ? AND scheduled_at >= ? AND scheduled_at < ? ORDER BY scheduled_at"
        ))
        .bind(camp_id)
        .bind(CampTaskStatus::Scheduled.as_str())
        .bind(to_db_timestamp(&from))
        .bind(to_db_timestamp(&to))
        .fetch_all(pool)
        .await
    }

    pub async fn count_sent_between(
        pool: &sqlx::SqlitePool,
        camp_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM camp_tasks WHERE camp_id = ? AND status = ? AND sent_at >= ? AND sent_at < ?",
        )
        .bind(camp_id)
        .bind(CampTaskStatus::Sent.as_str())
        .bind(to_db_timestamp(&from))
        .bind(to_db_timestamp(&to))
        .fetch_one(pool)
        .await
    }

    /// Moves a task from `scheduled` to `sending`. Only one caller can win.
    pub async fn claim(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        Self::transition(pool, id, CampTaskStatus::Scheduled, CampTaskStatus::Sending).await
    }

    pub async fn mark_sent(
        pool: &sqlx::SqlitePool,
        id: i64,
        message_id: i64,
        sent_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE camp_tasks SET status = ?, message_id = ?, sent_at = ? WHERE id = ?")
            .bind(CampTaskStatus::Sent.as_str())
            .bind(message_id)
            .bind(to_db_timestamp(&sent_at))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        Self::transition(pool, id, CampTaskStatus::Sending, CampTaskStatus::Failed).await
    }

    pub async fn mark_skipped(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        Self::transition(pool, id, CampTaskStatus::Scheduled, CampTaskStatus::Skipped).await
    }

    /// Gives up on scheduled tasks that are older than `cutoff`.
    pub async fn mark_missed_before(pool: &sqlx::SqlitePool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE camp_tasks SET status = ? WHERE status = ? AND scheduled_at < ?")
            .bind(CampTaskStatus::Missed.as_str())
            .bind(CampTaskStatus::Scheduled.as_str())
            .bind(to_db_timestamp(&cutoff))
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn transition(
        pool: &sqlx::SqlitePool,
        id: i64,
        from: CampTaskStatus,
        to: CampTaskStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE camp_tasks SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
