use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::bot::callback_data::CallbackAction;
use crate::database::models::*;
use crate::database::DatabaseManager;
use crate::schedule::{builtin_slots, due_slots, ScheduleSlot, ScheduleType};
use crate::services::messages::{
    camp_task_message, group_task_message, private_reminder_message, DONE_BUTTON, JOIN_TASK_BUTTON,
};
use crate::error::NotifyError;
use crate::services::notifier::Notifier;
use crate::utils::datetime::to_db_date;
use crate::utils::logging::log_dispatch;

/// What one dispatch tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub group_tasks_sent: usize,
    pub reminders_sent: usize,
    pub camp_tasks_sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub missed: u64,
}

impl DispatchSummary {
    pub fn sent(&self) -> usize {
        self.group_tasks_sent + self.reminders_sent + self.camp_tasks_sent
    }
}

/// Sends every scheduled message that is due, each at most once.
///
/// A message is claimed in the database before it is sent. Whatever happens
/// to the send afterwards, no later tick will pick the same occurrence again.
#[derive(Clone)]
pub struct TaskDispatcher {
    db: Arc<DatabaseManager>,
    notifier: Arc<dyn Notifier>,
    grace: Duration,
    default_tz: Tz,
}

impl TaskDispatcher {
    pub fn new(db: Arc<DatabaseManager>, notifier: Arc<dyn Notifier>, grace: Duration, default_tz: Tz) -> Self {
        Self {
            db,
            notifier,
            grace,
            default_tz,
        }
    }

    pub async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<DispatchSummary, sqlx::Error> {
        let mut summary = DispatchSummary::default();

        if let Err(e) = self.dispatch_group_schedules(now, &mut summary).await {
            tracing::error!("Group schedule pass failed: {}", e);
        }
        if let Err(e) = self.dispatch_private_reminders(now, &mut summary).await {
            tracing::error!("Private reminder pass failed: {}", e);
        }
        if let Err(e) = self.dispatch_camp_tasks(now, &mut summary).await {
            tracing::error!("Camp task pass failed: {}", e);
        }

        if summary.sent() > 0 {
            SystemStat::increment(&self.db.pool, STAT_MESSAGES_SENT, summary.sent() as i64, now).await?;
        }

        if summary != DispatchSummary::default() {
            tracing::debug!(?summary, "Dispatch tick finished");
        }
        Ok(summary)
    }

    async fn dispatch_group_schedules(
        &self,
        now: DateTime<Utc>,
        summary: &mut DispatchSummary,
    ) -> Result<(), sqlx::Error> {
        for group in Group::find_with_schedules(&self.db.pool).await? {
            if let Err(e) = self.dispatch_group(&group, now, summary).await {
                tracing::error!("Dispatch for group {} failed: {}", group.telegram_chat_id, e);
            }
        }
        Ok(())
    }

    async fn dispatch_group(
        &self,
        group: &Group,
        now: DateTime<Utc>,
        summary: &mut DispatchSummary,
    ) -> Result<(), sqlx::Error> {
        let pool = &self.db.pool;
        let now_local = now.with_timezone(&group.tz(self.default_tz)).naive_local();

        for schedule_type in group.enabled_schedules() {
            let slots = match schedule_type {
                ScheduleType::Custom => CustomSlot::schedule_for_group(pool, group.id).await?,
                builtin => builtin_slots(builtin),
            };

            for (date, slot) in due_slots(&slots, now_local, self.grace) {
                let Some(task) = GroupTask::claim(pool, group.id, date, schedule_type, slot, now).await? else {
                    continue;
                };

                let callback = CallbackAction::JoinGroupTask(task.id).to_string();
                let result = self
                    .notifier
                    .send_with_button(
                        group.telegram_chat_id,
                        group_task_message(schedule_type, slot),
                        JOIN_TASK_BUTTON.to_string(),
                        callback,
                    )
                    .await;

                match result {
                    Ok(message_id) => {
                        GroupTask::mark_sent(pool, task.id, message_id as i64, now).await?;
                        log_dispatch("group_task", group.telegram_chat_id, &slot.title, Ok(()));
                        summary.group_tasks_sent += 1;
                    }
                    Err(e) => {
                        GroupTask::mark_failed(pool, task.id).await?;
                        log_dispatch("group_task", group.telegram_chat_id, &slot.title, Err(e.to_string().as_str()));
                        summary.failed += 1;
                        if e.chat_unreachable() {
                            Group::deactivate(pool, group.telegram_chat_id).await?;
                            tracing::warn!("Group {} is gone, deactivated", group.telegram_chat_id);
                            return Ok(());
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn dispatch_private_reminders(
        &self,
        now: DateTime<Utc>,
        summary: &mut DispatchSummary,
    ) -> Result<(), sqlx::Error> {
        let pool = &self.db.pool;
        let now_local = now.with_timezone(&self.default_tz).naive_local();

        for user in User::find_with_preference(pool).await? {
            if let Err(e) = self.remind_user(&user, now_local, now, summary).await {
                tracing::error!("Reminders for user {} failed: {}", user.telegram_id, e);
            }
        }

        Ok(())
    }

    async fn remind_user(
        &self,
        user: &User,
        now_local: chrono::NaiveDateTime,
        now: DateTime<Utc>,
        summary: &mut DispatchSummary,
    ) -> Result<(), sqlx::Error> {
        let pool = &self.db.pool;
        let Some(schedule_type) = user.preferred_schedule() else {
            return Ok(());
        };
        let slots = builtin_slots(schedule_type);

        for (date, slot) in due_slots(&slots, now_local, self.grace) {
            let already_done = ScheduleTracker::find(pool, user.id, date, schedule_type)
                .await?
                .map(|tracker| tracker.has_task(&slot.key))
                .unwrap_or(false);
            if already_done || !UserReminder::claim(pool, user.id, date, schedule_type, &slot.key, now).await? {
                continue;
            }

            match self.send_reminder(user.telegram_id, schedule_type, date, slot).await {
                Ok(()) => {
                    log_dispatch("reminder", user.telegram_id, &slot.title, Ok(()));
                    summary.reminders_sent += 1;
                }
                Err(e) => {
                    let detail = format!("{} ({})", e, to_db_date(date));
                    log_dispatch("reminder", user.telegram_id, &slot.title, Err(detail.as_str()));
                    summary.failed += 1;
                    if e.user_unreachable() {
                        User::deactivate(pool, user.id).await?;
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    async fn send_reminder(
        &self,
        chat_id: i64,
        schedule_type: ScheduleType,
        date: NaiveDate,
        slot: &ScheduleSlot,
    ) -> Result<(), NotifyError> {
        let callback = CallbackAction::CompletePrivateTask {
            schedule_type,
            date,
            key: slot.key.clone(),
        }
        .to_string();

        self.notifier
            .send_with_button(
                chat_id,
                private_reminder_message(schedule_type, slot),
                DONE_BUTTON.to_string(),
                callback,
            )
            .await
            .map(|_| ())
    }

    async fn dispatch_camp_tasks(
        &self,
        now: DateTime<Utc>,
        summary: &mut DispatchSummary,
    ) -> Result<(), sqlx::Error> {
        let pool = &self.db.pool;
        let earliest = now - self.grace;

        let missed = CampTask::mark_missed_before(pool, earliest).await?;
        if missed > 0 {
            tracing::warn!(missed, "Camp tasks passed their grace period unsent");
            summary.missed += missed;
        }

        for task in CampTask::find_due(pool, earliest, now + Duration::minutes(1)).await? {
            if let Err(e) = self.dispatch_camp_task(&task, now, summary).await {
                tracing::error!("Dispatch of camp task {} failed: {}", task.id, e);
            }
        }

        Ok(())
    }

    async fn dispatch_camp_task(
        &self,
        task: &CampTask,
        now: DateTime<Utc>,
        summary: &mut DispatchSummary,
    ) -> Result<(), sqlx::Error> {
        let pool = &self.db.pool;
        let camp = Camp::find_by_id(pool, task.camp_id).await?;
        let in_range = match (&camp, task.scheduled_time()) {
            (Some(camp), Some(at)) => camp.is_active && camp.contains(at),
            _ => false,
        };
        let group = match &camp {
            Some(camp) => Group::find_by_id(pool, camp.group_id).await?,
            None => None,
        };

        let (Some(camp), Some(group), true) = (camp, group, in_range) else {
            if CampTask::mark_skipped(pool, task.id).await? {
                summary.skipped += 1;
            }
            return Ok(());
        };

        if !CampTask::claim(pool, task.id).await? {
            return Ok(());
        }

        let callback = CallbackAction::JoinCampTask(task.id).to_string();
        let result = self
            .notifier
            .send_with_button(
                group.telegram_chat_id,
                camp_task_message(&camp, task),
                JOIN_TASK_BUTTON.to_string(),
                callback,
            )
            .await;

        match result {
            Ok(message_id) => {
                CampTask::mark_sent(pool, task.id, message_id as i64, now).await?;
                log_dispatch("camp_task", group.telegram_chat_id, &task.title, Ok(()));
                summary.camp_tasks_sent += 1;
            }
            Err(e) => {
                CampTask::mark_failed(pool, task.id).await?;
                log_dispatch("camp_task", group.telegram_chat_id, &task.title, Err(e.to_string().as_str()));
                summary.failed += 1;
            }
        }

        Ok(())
    }
}
