use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqliteConnection};

use crate::schedule::{next_streak, AchievementLevel, ScheduleType};
use crate::utils::datetime::{parse_db_date, to_db_date, to_db_timestamp};

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, preferred_schedule, is_active, \
    total_points, morning_points, evening_points, custom_points, camp_points, streak_days, \
    last_streak_date, total_tasks_completed, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub preferred_schedule: String,
    pub is_active: bool,
    pub total_points: i64,
    pub morning_points: i64,
    pub evening_points: i64,
    pub custom_points: i64,
    pub camp_points: i64,
    pub streak_days: i64,
    pub last_streak_date: Option<String>,
    pub total_tasks_completed: i64,
    pub created_at: String,
}

/// Identity of the Telegram account behind an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl From<&teloxide::types::User> for UserProfile {
    fn from(user: &teloxide::types::User) -> Self {
        Self {
            telegram_id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()).filter(|name| !name.trim().is_empty()),
        }
    }
}

/// Which point bucket an award lands in, besides the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsSource {
    Schedule(ScheduleType),
    Camp,
}

impl PointsSource {
    fn column(&self) -> &'static str {
        match self {
            PointsSource::Schedule(schedule_type) => schedule_type.points_column(),
            PointsSource::Camp => "camp_points",
        }
    }
}

/// `@username`, else the first name, else a generic label.
pub fn display_name(username: Option<&str>, first_name: Option<&str>, telegram_id: i64) -> String {
    match (username, first_name) {
        (Some(username), _) if !username.is_empty() => format!("@{username}"),
        (_, Some(first_name)) if !first_name.is_empty() => first_name.to_string(),
        _ => format!("User {telegram_id}"),
    }
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(self.username.as_deref(), self.first_name.as_deref(), self.telegram_id)
    }

    pub fn preferred_schedule(&self) -> Option<ScheduleType> {
        match self.preferred_schedule.parse::<ScheduleType>() {
            Ok(ScheduleType::Custom) | Err(_) => None,
            Ok(schedule_type) => Some(schedule_type),
        }
    }

    pub fn level(&self) -> AchievementLevel {
        AchievementLevel::from_points(self.total_points)
    }

    pub async fn find_by_telegram_id<'e, E>(executor: E, telegram_id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?"))
            .bind(telegram_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Creates the user on first contact and refreshes their names afterwards.
    pub async fn upsert_profile(
        conn: &mut SqliteConnection,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (telegram_id, username, first_name, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(telegram_id) DO UPDATE SET
                username = excluded.username,
                first_name = COALESCE(excluded.first_name, users.first_name),
                is_active = TRUE
            "#,
        )
        .bind(profile.telegram_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(to_db_timestamp(&now))
        .execute(&mut *conn)
        .await?;

        Self::find_by_telegram_id(&mut *conn, profile.telegram_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn set_preferred_schedule(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        schedule: Option<ScheduleType>,
    ) -> Result<(), sqlx::Error> {
        let value = schedule.map(|s| s.as_str()).unwrap_or("none");
        sqlx::query("UPDATE users SET preferred_schedule = ? WHERE id = ?")
            .bind(value)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active users following the morning or evening schedule privately.
    pub async fn find_with_preference(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = TRUE AND preferred_schedule IN ('morning', 'evening')"
        ))
        .fetch_all(pool)
        .await
    }

    /// Adds `points` to the total and to the bucket of `source`. Non-positive awards are ignored.
    pub async fn add_points(
        conn: &mut SqliteConnection,
        user_id: i64,
        points: i64,
        source: PointsSource,
    ) -> Result<(), sqlx::Error> {
        if points <= 0 {
            return Ok(());
        }

        let column = source.column();
        sqlx::query(&format!(
            "UPDATE users SET total_points = total_points + ?, {column} = {column} + ? WHERE id = ?"
        ))
        .bind(points)
        .bind(points)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn increment_tasks_completed(conn: &mut SqliteConnection, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET total_tasks_completed = total_tasks_completed + 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Moves the streak for activity on `today` and returns the new value.
    pub async fn record_activity_day(
        conn: &mut SqliteConnection,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        let (streak, last): (i64, Option<String>) =
            sqlx::query_as("SELECT streak_days, last_streak_date FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await?;

        let last_date = last.as_deref().and_then(parse_db_date);
        let streak = next_streak(last_date, streak, today);

        sqlx::query("UPDATE users SET streak_days = ?, last_streak_date = ? WHERE id = ?")
            .bind(streak)
            .bind(to_db_date(today))
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        Ok(streak)
    }

    /// Zeroes streaks whose last activity is older than `yesterday`.
    pub async fn reset_stale_streaks(pool: &sqlx::SqlitePool, yesterday: NaiveDate) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET streak_days = 0 WHERE streak_days > 0 AND (last_streak_date IS NULL OR last_streak_date < ?)",
        )
        .bind(to_db_date(yesterday))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    pub async fn find_active(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE is_active = TRUE ORDER BY id"))
            .fetch_all(pool)
            .await
    }

    /// Stops broadcasts and reminders to a user who blocked the bot. Any later contact reactivates them.
    pub async fn deactivate(pool: &sqlx::SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE WHERE id = ? AND is_active = TRUE")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn usage_counts(pool: &sqlx::SqlitePool) -> Result<UserUsage, sqlx::Error> {
        let (total, active, morning, evening, custom) = sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(is_active = TRUE), 0),
                COALESCE(SUM(preferred_schedule = 'morning'), 0),
                COALESCE(SUM(preferred_schedule = 'evening'), 0),
                COALESCE(SUM(preferred_schedule = 'custom'), 0)
            FROM users
            "#,
        )
        .fetch_one(pool)
        .await?;

        Ok(UserUsage { total, active, morning, evening, custom })
    }
}

/// Head counts for the admin statistics command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UserUsage {
    pub total: i64,
    pub active: i64,
    pub morning: i64,
    pub evening: i64,
    pub custom: i64,
}
