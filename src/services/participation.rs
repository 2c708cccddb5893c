use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::SqliteConnection;
use std::sync::Arc;

use crate::database::models::*;
use crate::database::DatabaseManager;
use crate::error::ParticipationError;
use crate::schedule::{builtin_slots, find_builtin_slot, ScheduleType};

type Result<T> = std::result::Result<T, ParticipationError>;

/// Result of joining a group schedule task or completing a private one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskJoinOutcome {
    pub points_awarded: i64,
    /// Set when this task finished the whole day's schedule.
    pub completion_bonus: Option<i64>,
    pub total_points: i64,
    pub streak_days: i64,
    /// People who joined the same posted task so far.
    pub participants: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampJoinStatus {
    Joined,
    Rejoined,
    AlreadyMember,
}

#[derive(Debug, Clone)]
pub struct CampDeparture {
    pub camp: Camp,
    pub participants: i64,
}

#[derive(Debug, Clone)]
pub struct CampMembership {
    pub camp: Camp,
    pub status: CampJoinStatus,
    pub participants: i64,
}

#[derive(Debug, Clone)]
pub struct CampTaskJoinOutcome {
    pub camp: Camp,
    pub points_awarded: i64,
    pub camp_points: i64,
    pub rank: i64,
    /// The join also made the user a camp member.
    pub joined_camp: bool,
    pub participants: i64,
}

/// Records joins and completions, awarding points at most once per task.
///
/// Every operation runs in a single transaction, and the "once" rules are
/// backed by unique indexes so a double tap cannot award twice.
#[derive(Clone)]
pub struct ParticipationService {
    db: Arc<DatabaseManager>,
    default_tz: Tz,
}

impl ParticipationService {
    pub fn new(db: Arc<DatabaseManager>, default_tz: Tz) -> Self {
        Self { db, default_tz }
    }

    pub async fn join_group_task(
        &self,
        task_id: i64,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<TaskJoinOutcome> {
        let mut tx = self.db.pool.begin().await?;

        let task = GroupTask::find_by_id(&mut *tx, task_id)
            .await?
            .ok_or(ParticipationError::TaskNotFound(task_id))?;
        if !task.is_sent() {
            return Err(ParticipationError::TaskNotSent);
        }
        let window = task.window().ok_or(ParticipationError::TaskNotSent)?;
        if !window.is_open(now) {
            return Err(ParticipationError::WindowClosed);
        }
        let schedule_type = task
            .schedule_type()
            .ok_or_else(|| ParticipationError::UnknownScheduleTask(task.task_key.clone()))?;
        let schedule_date = task
            .schedule_date()
            .ok_or_else(|| ParticipationError::UnknownScheduleTask(task.task_key.clone()))?;

        let user = User::upsert_profile(&mut tx, profile, now).await?;
        if !GroupTaskParticipation::insert(&mut tx, task.id, user.id, task.points, now).await? {
            return Err(ParticipationError::AlreadyJoined);
        }

        let tz = Group::find_by_id(&mut *tx, task.group_id)
            .await?
            .map(|group| group.tz(self.default_tz))
            .unwrap_or(self.default_tz);
        let today = now.with_timezone(&tz).date_naive();

        User::add_points(&mut tx, user.id, task.points, PointsSource::Schedule(schedule_type)).await?;
        User::increment_tasks_completed(&mut tx, user.id).await?;
        let streak_days = User::record_activity_day(&mut tx, user.id, today).await?;
        GroupParticipant::record_completion(&mut tx, task.group_id, user.id, task.points, now).await?;

        let completion_bonus = match ScheduleTracker::mark_task(
            &mut tx,
            user.id,
            schedule_date,
            schedule_type,
            &task.task_key,
            task.points,
        )
        .await?
        {
            Some(tracker) => apply_completion_bonus(&mut tx, user.id, &tracker, schedule_type).await?,
            None => None,
        };

        ActivityLog::record(
            &mut *tx,
            user.id,
            "group_task",
            Some(&format!("{}:{}", schedule_type, task.task_key)),
            now,
        )
        .await?;

        let participants = GroupTaskParticipation::count_for_task(&mut *tx, task.id).await?;
        let total_points = current_total(&mut tx, user.id).await?;
        tx.commit().await?;

        tracing::info!(
            task_id,
            user = profile.telegram_id,
            points = task.points,
            "Group task joined"
        );

        Ok(TaskJoinOutcome {
            points_awarded: task.points + completion_bonus.unwrap_or(0),
            completion_bonus,
            total_points,
            streak_days,
            participants,
        })
    }

    /// Marks a task of the user's private schedule as done for `date`.
    ///
    /// Only today's tasks whose time has arrived can be completed.
    pub async fn complete_private_task(
        &self,
        profile: &UserProfile,
        schedule_type: ScheduleType,
        date: NaiveDate,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskJoinOutcome> {
        let now_local = now.with_timezone(&self.default_tz).naive_local();
        if date != now_local.date() {
            return Err(ParticipationError::NotToday);
        }
        let slot = find_builtin_slot(schedule_type, key)
            .ok_or_else(|| ParticipationError::UnknownScheduleTask(key.to_string()))?;
        if now_local.time() < slot.time {
            return Err(ParticipationError::TaskNotSent);
        }

        let mut tx = self.db.pool.begin().await?;
        let user = User::upsert_profile(&mut tx, profile, now).await?;

        let tracker = ScheduleTracker::mark_task(&mut tx, user.id, date, schedule_type, &slot.key, slot.points)
            .await?
            .ok_or(ParticipationError::AlreadyJoined)?;

        User::add_points(&mut tx, user.id, slot.points, PointsSource::Schedule(schedule_type)).await?;
        User::increment_tasks_completed(&mut tx, user.id).await?;
        let streak_days = User::record_activity_day(&mut tx, user.id, date).await?;
        let completion_bonus = apply_completion_bonus(&mut tx, user.id, &tracker, schedule_type).await?;

        ActivityLog::record(
            &mut *tx,
            user.id,
            "private_task",
            Some(&format!("{}:{}", schedule_type, slot.key)),
            now,
        )
        .await?;

        let total_points = current_total(&mut tx, user.id).await?;
        tx.commit().await?;

        Ok(TaskJoinOutcome {
            points_awarded: slot.points + completion_bonus.unwrap_or(0),
            completion_bonus,
            total_points,
            streak_days,
            participants: 1,
        })
    }

    pub async fn join_camp(
        &self,
        camp_id: i64,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<CampMembership> {
        let mut tx = self.db.pool.begin().await?;

        let camp = Camp::find_by_id(&mut *tx, camp_id)
            .await?
            .ok_or(ParticipationError::CampNotFound(camp_id))?;
        if !camp.is_joinable(now) {
            return Err(ParticipationError::CampInactive);
        }

        let user = User::upsert_profile(&mut tx, profile, now).await?;
        let (_, status) = ensure_member(&mut tx, &camp, user.id, now).await?;

        if status != CampJoinStatus::AlreadyMember {
            ActivityLog::record(&mut *tx, user.id, "camp_join", Some(&camp.id.to_string()), now).await?;
        }

        let participants = CampParticipant::count_active(&mut *tx, camp.id).await?;
        tx.commit().await?;

        Ok(CampMembership {
            camp,
            status,
            participants,
        })
    }

    /// Leaves a camp. Earned points are kept and count again after rejoining.
    pub async fn leave_camp(&self, camp_id: i64, telegram_id: i64, now: DateTime<Utc>) -> Result<CampDeparture> {
        let mut tx = self.db.pool.begin().await?;

        let camp = Camp::find_by_id(&mut *tx, camp_id)
            .await?
            .ok_or(ParticipationError::CampNotFound(camp_id))?;
        let user = User::find_by_telegram_id(&mut *tx, telegram_id)
            .await?
            .ok_or(ParticipationError::NotCampMember)?;
        let participant = CampParticipant::find(&mut *tx, camp.id, user.id)
            .await?
            .ok_or(ParticipationError::NotCampMember)?;
        if !CampParticipant::deactivate(&mut *tx, participant.id).await? {
            return Err(ParticipationError::NotCampMember);
        }

        ActivityLog::record(&mut *tx, user.id, "camp_leave", Some(&camp.id.to_string()), now).await?;
        let participants = CampParticipant::count_active(&mut *tx, camp.id).await?;
        tx.commit().await?;

        Ok(CampDeparture { camp, participants })
    }

    pub async fn join_camp_task(
        &self,
        task_id: i64,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<CampTaskJoinOutcome> {
        let mut tx = self.db.pool.begin().await?;

        let task = CampTask::find_by_id(&mut *tx, task_id)
            .await?
            .ok_or(ParticipationError::TaskNotFound(task_id))?;
        if !task.is_sent() {
            return Err(ParticipationError::TaskNotSent);
        }
        let camp = Camp::find_by_id(&mut *tx, task.camp_id)
            .await?
            .ok_or(ParticipationError::CampNotFound(task.camp_id))?;
        if !camp.is_active {
            return Err(ParticipationError::CampInactive);
        }
        let window = task.window().ok_or(ParticipationError::TaskNotSent)?;
        if !window.is_open(now) {
            return Err(ParticipationError::WindowClosed);
        }

        let user = User::upsert_profile(&mut tx, profile, now).await?;
        let (participant, status) = ensure_member(&mut tx, &camp, user.id, now).await?;

        if !CampTaskParticipation::insert(&mut tx, task.id, participant.id, task.points, now).await? {
            return Err(ParticipationError::AlreadyJoined);
        }

        let tz = Group::find_by_id(&mut *tx, camp.group_id)
            .await?
            .map(|group| group.tz(self.default_tz))
            .unwrap_or(self.default_tz);

        CampParticipant::add_points(&mut *tx, participant.id, task.points).await?;
        User::add_points(&mut tx, user.id, task.points, PointsSource::Camp).await?;
        User::increment_tasks_completed(&mut tx, user.id).await?;
        User::record_activity_day(&mut tx, user.id, now.with_timezone(&tz).date_naive()).await?;
        ActivityLog::record(&mut *tx, user.id, "camp_task", Some(&task.id.to_string()), now).await?;

        let participants = CampParticipant::count_active(&mut *tx, camp.id).await?;
        tx.commit().await?;

        let participant = CampParticipant::find(&self.db.pool, camp.id, user.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let rank = CampParticipant::rank_of(&self.db.pool, &participant).await?;

        tracing::info!(
            task_id,
            camp_id = camp.id,
            user = profile.telegram_id,
            points = task.points,
            "Camp task joined"
        );

        Ok(CampTaskJoinOutcome {
            camp,
            points_awarded: task.points,
            camp_points: participant.total_points,
            rank,
            joined_camp: status != CampJoinStatus::AlreadyMember,
            participants,
        })
    }
}

/// Makes the user an active camp member, respecting the participant limit.
async fn ensure_member(
    conn: &mut SqliteConnection,
    camp: &Camp,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(CampParticipant, CampJoinStatus)> {
    let existing = CampParticipant::find(&mut *conn, camp.id, user_id).await?;
    if let Some(participant) = &existing {
        if participant.is_active {
            return Ok((participant.clone(), CampJoinStatus::AlreadyMember));
        }
    }

    if camp.has_capacity_limit()
        && CampParticipant::count_active(&mut *conn, camp.id).await? >= camp.max_participants
    {
        return Err(ParticipationError::CampFull);
    }

    match existing {
        Some(mut participant) => {
            CampParticipant::reactivate(&mut *conn, participant.id).await?;
            participant.is_active = true;
            Ok((participant, CampJoinStatus::Rejoined))
        }
        None => {
            let participant = CampParticipant::insert(conn, camp.id, user_id, now).await?;
            Ok((participant, CampJoinStatus::Joined))
        }
    }
}

/// Gives the day's completion bonus once every task of the schedule is marked.
async fn apply_completion_bonus(
    conn: &mut SqliteConnection,
    user_id: i64,
    tracker: &ScheduleTracker,
    schedule_type: ScheduleType,
) -> std::result::Result<Option<i64>, sqlx::Error> {
    let bonus = schedule_type.completion_bonus();
    if bonus <= 0 {
        return Ok(None);
    }

    let all_done = builtin_slots(schedule_type)
        .iter()
        .all(|slot| tracker.has_task(&slot.key));
    if !all_done || !ScheduleTracker::award_completion_once(&mut *conn, tracker.id, bonus).await? {
        return Ok(None);
    }

    User::add_points(conn, user_id, bonus, PointsSource::Schedule(schedule_type)).await?;
    Ok(Some(bonus))
}

async fn current_total(conn: &mut SqliteConnection, user_id: i64) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT total_points FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
}
