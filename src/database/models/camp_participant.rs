use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqliteConnection};

use super::group_participant::LeaderboardEntry;
use crate::utils::datetime::to_db_timestamp;

const PARTICIPANT_COLUMNS: &str = "id, camp_id, user_id, total_points, is_active, joined_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampParticipant {
    pub id: i64,
    pub camp_id: i64,
    pub user_id: i64,
    pub total_points: i64,
    pub is_active: bool,
    pub joined_at: String,
}

impl CampParticipant {
    pub async fn find<'e, E>(executor: E, camp_id: i64, user_id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, CampParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM camp_participants WHERE camp_id = ? AND user_id = ?"
        ))
        .bind(camp_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn count_active<'e, E>(executor: E, camp_id: i64) -> Result<i64, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM camp_participants WHERE camp_id = ? AND is_active = TRUE",
        )
        .bind(camp_id)
        .fetch_one(executor)
        .await
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        camp_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query("INSERT INTO camp_participants (camp_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(camp_id)
            .bind(user_id)
            .bind(to_db_timestamp(&now))
            .execute(&mut *conn)
            .await?;

        Self::find(&mut *conn, camp_id, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn reactivate<'e, E>(executor: E, id: i64) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE camp_participants SET is_active = TRUE WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Marks the participant as having left. Points stay on the row.
    pub async fn deactivate<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE camp_participants SET is_active = FALSE WHERE id = ? AND is_active = TRUE")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn add_points<'e, E>(executor: E, id: i64, points: i64) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE camp_participants SET total_points = total_points + ? WHERE id = ?")
            .bind(points.max(0))
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Active participants ranked by points, with the number of tasks each joined.
    pub async fn leaderboard(
        pool: &sqlx::SqlitePool,
        camp_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT u.telegram_id, u.username, u.first_name,
                   cp.total_points AS points,
                   (SELECT COUNT(*) FROM camp_task_participations ctp WHERE ctp.participant_id = cp.id) AS completions
            FROM camp_participants cp
            JOIN users u ON u.id = cp.user_id
            WHERE cp.camp_id = ? AND cp.is_active = TRUE
            ORDER BY cp.total_points DESC, cp.joined_at ASC
            LIMIT ?
            "#,
        )
        .bind(camp_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// 1-based rank by points among active participants.
    pub async fn rank_of(pool: &sqlx::SqlitePool, participant: &CampParticipant) -> Result<i64, sqlx::Error> {
        let ahead = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM camp_participants WHERE camp_id = ? AND is_active = TRUE AND total_points > ?",
        )
        .bind(participant.camp_id)
        .bind(participant.total_points)
        .fetch_one(pool)
        .await?;
        Ok(ahead + 1)
    }
}

/// A participant's join of a posted camp task.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampTaskParticipation {
    pub id: i64,
    pub task_id: i64,
    pub participant_id: i64,
    pub points_earned: i64,
    pub participated_at: String,
}

impl CampTaskParticipation {
    /// Records the join once. Returns `false` on a repeat.
    pub async fn insert(
        conn: &mut SqliteConnection,
        task_id: i64,
        participant_id: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO camp_task_participations (task_id, participant_id, points_earned, participated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(participant_id)
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
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM camp_task_participations WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(executor)
            .await
    }
}
