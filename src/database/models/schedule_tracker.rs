use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqliteConnection};

use crate::schedule::ScheduleType;
use crate::utils::datetime::{to_db_date, to_db_timestamp};

const TRACKER_COLUMNS: &str =
    "id, user_id, schedule_date, schedule_type, completed_tasks, points, completion_awarded";

/// Which tasks of one schedule a user finished on one local date.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScheduleTracker {
    pub id: i64,
    pub user_id: i64,
    pub schedule_date: String,
    pub schedule_type: String,
    /// Comma separated task keys.
    pub completed_tasks: String,
    pub points: i64,
    pub completion_awarded: bool,
}

impl ScheduleTracker {
    pub fn completed_keys(&self) -> Vec<&str> {
        self.completed_tasks
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .collect()
    }

    pub fn has_task(&self, key: &str) -> bool {
        self.completed_keys().contains(&key)
    }

    pub async fn find<'e, E>(
        executor: E,
        user_id: i64,
        schedule_date: NaiveDate,
        schedule_type: ScheduleType,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ScheduleTracker>(&format!(
            "SELECT {TRACKER_COLUMNS} FROM schedule_trackers WHERE user_id = ? AND schedule_date = ? AND schedule_type = ?"
        ))
        .bind(user_id)
        .bind(to_db_date(schedule_date))
        .bind(schedule_type.as_str())
        .fetch_optional(executor)
        .await
    }

    pub async fn get_or_create(
        conn: &mut SqliteConnection,
        user_id: i64,
        schedule_date: NaiveDate,
        schedule_type: ScheduleType,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO schedule_trackers (user_id, schedule_date, schedule_type) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(to_db_date(schedule_date))
        .bind(schedule_type.as_str())
        .execute(&mut *conn)
        .await?;

        Self::find(&mut *conn, user_id, schedule_date, schedule_type)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Adds `key` to the day's completed tasks.
    ///
    /// Returns the updated tracker, or `None` when the task was already marked.
    pub async fn mark_task(
        conn: &mut SqliteConnection,
        user_id: i64,
        schedule_date: NaiveDate,
        schedule_type: ScheduleType,
        key: &str,
        points: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tracker = Self::get_or_create(&mut *conn, user_id, schedule_date, schedule_type).await?;

        let result = sqlx::query(
            r#"
            UPDATE schedule_trackers
            SET completed_tasks = CASE WHEN completed_tasks = '' THEN ? ELSE completed_tasks || ',' || ? END,
                points = points + ?
            WHERE id = ? AND instr(',' || completed_tasks || ',', ?) = 0
            "#,
        )
        .bind(key)
        .bind(key)
        .bind(points.max(0))
        .bind(tracker.id)
        .bind(format!(",{key},"))
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find(&mut *conn, user_id, schedule_date, schedule_type).await
    }

    /// Flags the day as fully completed. Returns `false` if the bonus was already given.
    pub async fn award_completion_once(
        conn: &mut SqliteConnection,
        tracker_id: i64,
        bonus: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE schedule_trackers SET completion_awarded = TRUE, points = points + ? WHERE id = ? AND completion_awarded = FALSE",
        )
        .bind(bonus)
        .bind(tracker_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// A private reminder already sent to a user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserReminder {
    pub id: i64,
    pub user_id: i64,
    pub schedule_date: String,
    pub schedule_type: String,
    pub task_key: String,
    pub sent_at: String,
}

impl UserReminder {
    /// Claims the reminder for a slot occurrence. `false` means someone sent it already.
    pub async fn claim(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        schedule_date: NaiveDate,
        schedule_type: ScheduleType,
        task_key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_reminders (user_id, schedule_date, schedule_type, task_key, sent_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(to_db_date(schedule_date))
        .bind(schedule_type.as_str())
        .bind(task_key)
        .bind(to_db_timestamp(&now))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
