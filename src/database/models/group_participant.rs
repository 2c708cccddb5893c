use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use super::user::display_name;
use crate::utils::datetime::to_db_timestamp;

/// Per-group scoreboard row of a user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupParticipant {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub total_points: i64,
    pub daily_completion_count: i64,
    pub total_completion_count: i64,
    pub last_completion_at: Option<String>,
    pub joined_at: String,
}

/// A ranked row shared by group and camp leaderboards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub points: i64,
    pub completions: i64,
}

impl LeaderboardEntry {
    pub fn display_name(&self) -> String {
        display_name(self.username.as_deref(), self.first_name.as_deref(), self.telegram_id)
    }
}

impl GroupParticipant {
    pub async fn find(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GroupParticipant>(
            "SELECT id, group_id, user_id, total_points, daily_completion_count, total_completion_count, \
             last_completion_at, joined_at FROM group_participants WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Counts one completed task for the user in this group.
    pub async fn record_completion(
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let now = to_db_timestamp(&now);
        sqlx::query(
            r#"
            INSERT INTO group_participants
                (group_id, user_id, total_points, daily_completion_count, total_completion_count, last_completion_at, joined_at)
            VALUES (?, ?, ?, 1, 1, ?, ?)
            ON CONFLICT(group_id, user_id) DO UPDATE SET
                total_points = group_participants.total_points + excluded.total_points,
                daily_completion_count = group_participants.daily_completion_count + 1,
                total_completion_count = group_participants.total_completion_count + 1,
                last_completion_at = excluded.last_completion_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(points)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn leaderboard(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT u.telegram_id, u.username, u.first_name,
                   gp.total_points AS points, gp.total_completion_count AS completions
            FROM group_participants gp
            JOIN users u ON u.id = gp.user_id
            WHERE gp.group_id = ?
            ORDER BY gp.total_points DESC, gp.total_completion_count DESC, gp.joined_at ASC
            LIMIT ?
            "#,
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn reset_daily_counts(pool: &sqlx::SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE group_participants SET daily_completion_count = 0 WHERE daily_completion_count > 0")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
