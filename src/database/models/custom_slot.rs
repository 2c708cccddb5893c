use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::schedule::templates::SCHEDULE_TASK_DEADLINE_MINUTES;
use crate::schedule::ScheduleSlot;
use crate::utils::datetime::{format_time, parse_hhmm};

/// One entry of a group's custom schedule.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CustomSlot {
    pub id: i64,
    pub group_id: i64,
    pub slot_time: String,
    pub task_key: String,
    pub title: String,
    pub points: i64,
}

impl CustomSlot {
    pub fn to_schedule_slot(&self) -> Option<ScheduleSlot> {
        let time = parse_hhmm(&self.slot_time).ok()?;
        Some(ScheduleSlot {
            key: self.task_key.clone(),
            title: self.title.clone(),
            time,
            points: self.points,
            deadline_minutes: SCHEDULE_TASK_DEADLINE_MINUTES,
        })
    }

    /// Replaces the whole custom schedule of a group.
    pub async fn replace_for_group(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        slots: &[ScheduleSlot],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM custom_slots WHERE group_id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        for slot in slots {
            sqlx::query(
                "INSERT INTO custom_slots (group_id, slot_time, task_key, title, points) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(group_id)
            .bind(format_time(slot.time))
            .bind(&slot.key)
            .bind(&slot.title)
            .bind(slot.points)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    pub async fn find_by_group(pool: &sqlx::SqlitePool, group_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomSlot>(
            "SELECT id, group_id, slot_time, task_key, title, points FROM custom_slots WHERE group_id = ? ORDER BY slot_time",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// The group's custom schedule as slots, skipping rows with a broken time.
    pub async fn schedule_for_group(
        pool: &sqlx::SqlitePool,
        group_id: i64,
    ) -> Result<Vec<ScheduleSlot>, sqlx::Error> {
        Ok(Self::find_by_group(pool, group_id)
            .await?
            .iter()
            .filter_map(CustomSlot::to_schedule_slot)
            .collect())
    }
}
