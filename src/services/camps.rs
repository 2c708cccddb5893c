use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::database::models::{Camp, CampParticipant, CampTask, Group};
use crate::database::DatabaseManager;
use crate::error::CampError;
use crate::utils::validation::{parse_camp_args, parse_task_args};

/// Camp administration: creating camps and scheduling their tasks.
#[derive(Clone)]
pub struct CampService {
    db: Arc<DatabaseManager>,
    default_tz: Tz,
}

impl CampService {
    pub fn new(db: Arc<DatabaseManager>, default_tz: Tz) -> Self {
        Self { db, default_tz }
    }

    /// Creates a camp from `/newcamp` arguments, read in the group's timezone.
    pub async fn create_camp(
        &self,
        group: &Group,
        creator_id: i64,
        args: &str,
        now: DateTime<Utc>,
    ) -> Result<Camp, CampError> {
        let new_camp = parse_camp_args(args, group.tz(self.default_tz))?;

        if new_camp.end_at <= new_camp.start_at {
            return Err(CampError::EndBeforeStart);
        }
        if new_camp.start_at <= now {
            return Err(CampError::StartInPast);
        }

        let camp = Camp::create(&self.db.pool, group.id, creator_id, &new_camp, now).await?;
        tracing::info!(camp_id = camp.id, group_id = group.id, name = %camp.name, "Camp created");
        Ok(camp)
    }

    /// Schedules a camp task from `/addtask` arguments.
    ///
    /// Only the camp creator or an admin may add tasks, and the task time must
    /// be in the future and inside the camp's date range.
    pub async fn add_camp_task(
        &self,
        group: &Group,
        requester_id: i64,
        args: &str,
        now: DateTime<Utc>,
        is_admin: bool,
    ) -> Result<(Camp, CampTask), CampError> {
        let (camp_id, new_task) = parse_task_args(args, group.tz(self.default_tz))?;

        let camp = Camp::find_by_id(&self.db.pool, camp_id)
            .await?
            .filter(|camp| camp.group_id == group.id && camp.is_active)
            .ok_or(CampError::CampNotFound(camp_id))?;

        if camp.created_by != requester_id && !is_admin {
            return Err(CampError::NotAuthorized);
        }
        if !camp.contains(new_task.scheduled_at) {
            return Err(CampError::OutsideCampWindow);
        }
        if new_task.scheduled_at <= now {
            return Err(CampError::TimeInPast);
        }

        let task = CampTask::create(&self.db.pool, camp.id, &new_task, now).await?;
        tracing::info!(camp_id = camp.id, task_id = task.id, title = %task.title, "Camp task scheduled");
        Ok((camp, task))
    }

    /// Active camps of a group with their current participant counts.
    pub async fn list_camps(&self, group: &Group) -> Result<Vec<(Camp, i64)>, sqlx::Error> {
        let mut camps = Vec::new();
        for camp in Camp::find_active_by_group(&self.db.pool, group.id).await? {
            let participants = CampParticipant::count_active(&self.db.pool, camp.id).await?;
            camps.push((camp, participants));
        }
        Ok(camps)
    }
}
