use chrono::Utc;
use teloxide::prelude::*;

use super::{admin_group, ensure_group, report_db_error, sender};
use crate::bot::handlers::BotHandler;
use crate::database::models::*;
use crate::error::ParticipationError;
use crate::schedule::{builtin_slots, ScheduleType};
use crate::services::messages::schedule_overview;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_success, log_validation_error};
use crate::utils::markdown::escape_markdown;
use crate::utils::validation::{parse_custom_slots, CUSTOM_USAGE};

/// `/morning` and `/evening`: a toggle for group admins, a subscription in private chat.
pub async fn handle_schedule_command(
    bot: &Bot,
    msg: &Message,
    handler: &BotHandler,
    schedule_type: ScheduleType,
) -> ResponseResult<()> {
    if msg.chat.is_private() {
        return follow_schedule(bot, msg, handler, Some(schedule_type)).await;
    }

    let Some(group) = admin_group(bot, msg, handler).await? else {
        return Ok(());
    };

    let enabled = !group.schedule_enabled(schedule_type);
    if let Err(e) = Group::set_schedule_enabled(&handler.db.pool, group.id, schedule_type, enabled).await {
        return report_db_error(bot, msg.chat.id, "set_schedule_enabled", "groups", &e).await;
    }

    let (user, user_id) = sender(msg);
    log_command_success(
        schedule_type.as_str(),
        &user,
        user_id,
        msg.chat.id.0,
        Some(if enabled { "enabled" } else { "disabled" }),
    );

    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    if enabled {
        let text = format!(
            "{}\n\n{}",
            schedule_overview(schedule_type, &builtin_slots(schedule_type), &[]),
            escape_markdown("Each task is posted at its time with a button to join. Send the command again to turn it off."),
        );
        feedback.send_markdown(text).await?;
    } else {
        feedback
            .info(&format!("{} turned off for this group.", schedule_type.label()))
            .await?;
    }
    Ok(())
}

/// `/stop`: leave the private schedule.
pub async fn handle_stop(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .warning("Use /stop in a private chat with me. Group admins toggle schedules with /morning or /evening.")
            .await?;
        return Ok(());
    }
    follow_schedule(bot, msg, handler, None).await
}

async fn follow_schedule(
    bot: &Bot,
    msg: &Message,
    handler: &BotHandler,
    schedule_type: Option<ScheduleType>,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };

    let result = async {
        let mut conn = handler.db.pool.acquire().await?;
        let user = User::upsert_profile(&mut conn, &UserProfile::from(from), Utc::now()).await?;
        User::set_preferred_schedule(&handler.db.pool, user.id, schedule_type).await
    }
    .await;

    if let Err(e) = result {
        return report_db_error(bot, msg.chat.id, "set_preferred_schedule", "users", &e).await;
    }

    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    match schedule_type {
        Some(schedule_type) => {
            let text = format!(
                "{}\n\n{}",
                schedule_overview(schedule_type, &builtin_slots(schedule_type), &[]),
                escape_markdown("I'll remind you of every task. Tap Done or send /done <key> when you finish it, and /stop to unsubscribe."),
            );
            feedback.send_markdown(text).await?;
        }
        None => {
            feedback.success("Reminders stopped. Your points are kept.").await?;
        }
    }
    Ok(())
}

/// `/custom 06:00 Review, 14:30 Practice`: replace the group's custom slots and enable them.
pub async fn handle_custom(bot: &Bot, msg: &Message, handler: &BotHandler, args: &str) -> ResponseResult<()> {
    let Some(group) = admin_group(bot, msg, handler).await? else {
        return Ok(());
    };
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender(msg);

    if args.trim().is_empty() {
        feedback
            .send_command_help(
                "/custom",
                "Set the group's own daily slots. Each slot is posted at its time with a join button.",
                &[CUSTOM_USAGE],
            )
            .await?;
        return Ok(());
    }

    let slots = match parse_custom_slots(args) {
        Ok(slots) => slots,
        Err(e) => {
            log_validation_error("custom", args, &e.to_string(), user_id, msg.chat.id.0);
            feedback
                .validation_error(&e.to_string(), &format!("Example: {CUSTOM_USAGE}"))
                .await?;
            return Ok(());
        }
    };

    let saved = async {
        CustomSlot::replace_for_group(&handler.db.pool, group.id, &slots).await?;
        Group::set_schedule_enabled(&handler.db.pool, group.id, ScheduleType::Custom, true).await
    }
    .await;
    if let Err(e) = saved {
        return report_db_error(bot, msg.chat.id, "replace_for_group", "custom_slots", &e).await;
    }

    log_command_success("custom", &user, user_id, msg.chat.id.0, Some(&format!("{} slots", slots.len())));
    feedback
        .send_markdown(schedule_overview(ScheduleType::Custom, &slots, &[]))
        .await?;
    Ok(())
}

/// `/today`: the user's private checklist, or the tasks posted in a group today.
pub async fn handle_today(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let now = Utc::now();

    if !msg.chat.is_private() {
        let group = match ensure_group(handler, msg).await {
            Ok(group) => group,
            Err(e) => return report_db_error(bot, msg.chat.id, "get_or_create", "groups", &e).await,
        };
        let today = now.with_timezone(&group.tz(handler.config.timezone)).date_naive();
        let tasks = match GroupTask::find_for_group_date(&handler.db.pool, group.id, today).await {
            Ok(tasks) => tasks,
            Err(e) => return report_db_error(bot, msg.chat.id, "find_for_group_date", "group_tasks", &e).await,
        };

        if tasks.is_empty() {
            feedback.info("No tasks have been posted here today yet.").await?;
            return Ok(());
        }

        let mut text = String::from("📋 *Today*\n\n");
        for task in &tasks {
            let joined = GroupTaskParticipation::count_for_task(&handler.db.pool, task.id)
                .await
                .unwrap_or(0);
            let status = if task.is_sent() { "📌" } else { "⚠️" };
            text.push_str(&format!(
                "{} {}\n",
                status,
                escape_markdown(&format!("{} ({} joined)", task.title, joined))
            ));
        }
        feedback.send_markdown(text).await?;
        return Ok(());
    }

    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = match User::find_by_telegram_id(&handler.db.pool, from.id.0 as i64).await {
        Ok(user) => user,
        Err(e) => return report_db_error(bot, msg.chat.id, "find_by_telegram_id", "users", &e).await,
    };
    let Some(schedule_type) = user.as_ref().and_then(User::preferred_schedule) else {
        feedback
            .info("You are not following a schedule. Start one with /morning or /evening.")
            .await?;
        return Ok(());
    };
    let Some(user) = user else {
        return Ok(());
    };

    let today = now.with_timezone(&handler.config.timezone).date_naive();
    let tracker = match ScheduleTracker::find(&handler.db.pool, user.id, today, schedule_type).await {
        Ok(tracker) => tracker,
        Err(e) => return report_db_error(bot, msg.chat.id, "find", "schedule_trackers", &e).await,
    };

    let completed = tracker.as_ref().map(ScheduleTracker::completed_keys).unwrap_or_default();
    let points = tracker.as_ref().map(|t| t.points).unwrap_or(0);
    let text = format!(
        "{}\n\n{}",
        schedule_overview(schedule_type, &builtin_slots(schedule_type), &completed),
        escape_markdown(&format!("Points today: {points} · Streak: {} days", user.streak_days)),
    );
    feedback.send_markdown(text).await?;
    Ok(())
}

/// `/done <key>`: complete a task of today's private schedule.
pub async fn handle_done(bot: &Bot, msg: &Message, handler: &BotHandler, key: &str) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (name, user_id) = sender(msg);

    if !msg.chat.is_private() {
        feedback.warning("Use /done in a private chat with me.").await?;
        return Ok(());
    }
    let Some(from) = msg.from() else {
        return Ok(());
    };

    let key = key.trim();
    if key.is_empty() {
        feedback
            .send_command_help("/done", "Mark a task of today's schedule as done. /today lists the keys.", &["/done study_1"])
            .await?;
        return Ok(());
    }

    let schedule_type = match User::find_by_telegram_id(&handler.db.pool, user_id).await {
        Ok(user) => user.as_ref().and_then(User::preferred_schedule),
        Err(e) => return report_db_error(bot, msg.chat.id, "find_by_telegram_id", "users", &e).await,
    };
    let Some(schedule_type) = schedule_type else {
        feedback
            .info("You are not following a schedule. Start one with /morning or /evening.")
            .await?;
        return Ok(());
    };

    let now = Utc::now();
    let today = now.with_timezone(&handler.config.timezone).date_naive();
    match handler
        .participation
        .complete_private_task(&UserProfile::from(from), schedule_type, today, key, now)
        .await
    {
        Ok(outcome) => {
            log_command_success("done", &name, user_id, msg.chat.id.0, Some(key));
            let mut text = format!(
                "+{} points! Total: {} · Streak: {} days",
                outcome.points_awarded, outcome.total_points, outcome.streak_days
            );
            if let Some(bonus) = outcome.completion_bonus {
                text.push_str(&format!("\n🎉 Schedule complete, +{bonus} bonus included!"));
            }
            feedback.success(&text).await?;
        }
        Err(ParticipationError::Database(e)) => {
            log_command_error("done", &name, user_id, msg.chat.id.0, &e.to_string());
            feedback.error("Something went wrong, please try again later.").await?;
        }
        Err(e) => {
            feedback.send_markdown(escape_markdown(e.user_message())).await?;
        }
    }
    Ok(())
}
