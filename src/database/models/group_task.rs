use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqliteConnection};

use crate::schedule::{ParticipationWindow, ScheduleSlot, ScheduleType};
use crate::utils::datetime::{from_db_timestamp, parse_db_date, to_db_date, to_db_timestamp};

const GROUP_TASK_COLUMNS: &str = "id, group_id, schedule_date, schedule_type, task_key, title, points, \
    deadline_minutes, status, message_id, sent_at, created_at";

pub const TASK_STATUS_CLAIMED: &str = "claimed";
pub const TASK_STATUS_SENT: &str = "sent";
pub const TASK_STATUS_FAILED: &str = "failed";

/// A schedule slot posted to a group on a given local date.
///
/// The `(group_id, schedule_date, schedule_type, task_key)` key is unique, so
/// whichever dispatcher tick inserts the row first is the only one that sends.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupTask {
    pub id: i64,
    pub group_id: i64,
    pub schedule_date: String,
    pub schedule_type: String,
    pub task_key: String,
    pub title: String,
    pub points: i64,
    pub deadline_minutes: i64,
    pub status: String,
    pub message_id: Option<i64>,
    pub sent_at: Option<String>,
    pub created_at: String,
}

impl GroupTask {
    pub fn is_sent(&self) -> bool {
        self.status == TASK_STATUS_SENT
    }

    pub fn schedule_type(&self) -> Option<ScheduleType> {
        self.schedule_type.parse().ok()
    }

    pub fn schedule_date(&self) -> Option<NaiveDate> {
        parse_db_date(&self.schedule_date)
    }

    /// The join window, available once the task has been posted.
    pub fn window(&self) -> Option<ParticipationWindow> {
        let opened_at = from_db_timestamp(self.sent_at.as_deref()?)?;
        Some(ParticipationWindow::new(opened_at, self.deadline_minutes))
    }

    /// Inserts the dispatch record for a slot occurrence.
    ///
    /// Returns `None` when the occurrence was already claimed by an earlier tick.
    pub async fn claim(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        schedule_date: NaiveDate,
        schedule_type: ScheduleType,
        slot: &ScheduleSlot,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO group_tasks
                (group_id, schedule_date, schedule_type, task_key, title, points, deadline_minutes, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(group_id)
        .bind(to_db_date(schedule_date))
        .bind(schedule_type.as_str())
        .bind(&slot.key)
        .bind(&slot.title)
        .bind(slot.points)
        .bind(slot.deadline_minutes)
        .bind(TASK_STATUS_CLAIMED)
        .bind(to_db_timestamp(&now))
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, GroupTask>(&format!("SELECT {GROUP_TASK_COLUMNS} FROM group_tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_for_group_date(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        schedule_date: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GroupTask>(&format!(
            "SELECT {GROUP_TASK_COLUMNS} FROM group_tasks WHERE group_id = ? AND schedule_date = ? ORDER BY id"
        ))
        .bind(group_id)
        .bind(to_db_date(schedule_date))
        .fetch_all(pool)
        .await
    }

    pub async fn mark_sent(
        pool: &sqlx::SqlitePool,
        id: i64,
        message_id: i64,
        sent_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE group_tasks SET status = ?, message_id = ?, sent_at = ? WHERE id = ?")
            .bind(TASK_STATUS_SENT)
            .bind(message_id)
            .bind(to_db_timestamp(&sent_at))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(pool: &sqlx::SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE group_tasks SET status = ? WHERE id = ?")
            .bind(TASK_STATUS_FAILED)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// A user's join of a posted group task.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupTaskParticipation {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub points_earned: i64,
    pub completed_at: String,
}

impl GroupTaskParticipation {
    /// Records the join. Returns `false` if the user had already joined this task.
    pub async fn insert(
        conn: &mut SqliteConnection,
        task_id: i64,
        user_id: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO group_task_participations (task_id, user_id, points_earned, completed_at) VALUES (?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(user_id)
        .bind(points)
        .bind(to_db_timestamp(&now))
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_for_task<'e, E>(executor: E, task_id: i64) -> Result<i64, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM group_task_participations WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(executor)
            .await
    }
}
