use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::{admin_group, ensure_group, is_group_admin, report_db_error, require_group_chat, sender};
use crate::bot::callback_data::CallbackAction;
use crate::bot::handlers::BotHandler;
use crate::database::models::{Camp, CampParticipant, Group};
use crate::error::{CampError, ParticipationError};
use crate::services::messages::{camp_announcement, JOIN_CAMP_BUTTON};
use crate::services::reports::camp_report;
use crate::utils::datetime::format_local;
use crate::utils::feedback::{CommandFeedback, FeedbackType, StatusMessage};
use crate::utils::logging::{log_command_error, log_command_success, log_validation_error};
use crate::utils::markdown::{bold, escape_markdown};
use crate::utils::validation::{ADD_TASK_USAGE, NEW_CAMP_USAGE};

async fn reply_camp_error(
    feedback: &CommandFeedback,
    msg: &Message,
    command: &str,
    args: &str,
    usage: &str,
    error: CampError,
) -> ResponseResult<()> {
    let (user, user_id) = sender(msg);
    match error {
        CampError::Database(e) => {
            log_command_error(command, &user, user_id, msg.chat.id.0, &e.to_string());
            feedback.error("Something went wrong, please try again later.").await?;
        }
        CampError::NotAuthorized => {
            feedback.error("Only the camp creator or a group admin can do that.").await?;
        }
        other => {
            log_validation_error(command, args, &other.to_string(), user_id, msg.chat.id.0);
            feedback.validation_error(&other.to_string(), usage).await?;
        }
    }
    Ok(())
}

/// `/newcamp`: create a camp and post its announcement with a join button.
pub async fn handle_new_camp(bot: &Bot, msg: &Message, handler: &BotHandler, args: &str) -> ResponseResult<()> {
    let Some(group) = admin_group(bot, msg, handler).await? else {
        return Ok(());
    };
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender(msg);

    if args.trim().is_empty() {
        feedback
            .send_command_help(
                "/newcamp",
                "Create a study camp. Times are local to this group.",
                &[NEW_CAMP_USAGE, "/newcamp Finals week | Daily revision | 2025-06-01 08:00 | 2025-06-07 22:00 | 30"],
            )
            .await?;
        return Ok(());
    }

    let mut status = StatusMessage::new(CommandFeedback::new(bot.clone(), msg.chat.id), 2);
    status.step("Creating the camp...").await?;

    let camp = match handler.camps.create_camp(&group, user_id, args, Utc::now()).await {
        Ok(camp) => camp,
        Err(e) => {
            status.finish(FeedbackType::Error, "The camp was not created").await?;
            return reply_camp_error(&feedback, msg, "newcamp", args, NEW_CAMP_USAGE, e).await;
        }
    };
    status.step("Posting the announcement...").await?;

    let tz = group.tz(handler.config.timezone);
    let posted = handler
        .notifier
        .send_with_button(
            group.telegram_chat_id,
            camp_announcement(&camp, 0, tz),
            JOIN_CAMP_BUTTON.to_string(),
            CallbackAction::JoinCamp(camp.id).to_string(),
        )
        .await;

    match posted {
        Ok(message_id) => {
            if let Err(e) = Camp::set_announcement(&handler.db.pool, camp.id, message_id as i64).await {
                tracing::warn!("Failed to store announcement of camp {}: {}", camp.id, e);
            }
        }
        Err(e) => {
            tracing::warn!("Failed to announce camp {}: {}", camp.id, e);
            feedback
                .warning("The camp was created, but the announcement could not be posted. Members can join from /camps.")
                .await?;
        }
    }

    log_command_success("newcamp", &user, user_id, msg.chat.id.0, Some(&format!("camp {}", camp.id)));
    let done = format!(
        "Camp '{}' created with id {}. Add tasks with /addtask {} | title | description | YYYY-MM-DD HH:MM | points",
        camp.name, camp.id, camp.id
    );
    status.finish(FeedbackType::Success, &done).await?;
    Ok(())
}

/// `/addtask`: schedule a task for a camp of this group.
pub async fn handle_add_task(bot: &Bot, msg: &Message, handler: &BotHandler, args: &str) -> ResponseResult<()> {
    if !require_group_chat(bot, msg).await? {
        return Ok(());
    }
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender(msg);

    if args.trim().is_empty() {
        feedback
            .send_command_help(
                "/addtask",
                "Schedule a camp task. It is posted at its time and stays joinable until the deadline.",
                &[ADD_TASK_USAGE, "/addtask 3 | Chapter 4 | Read and summarise | 2025-06-02 09:00 | 5 | 15"],
            )
            .await?;
        return Ok(());
    }

    let group = match ensure_group(handler, msg).await {
        Ok(group) => group,
        Err(e) => return report_db_error(bot, msg.chat.id, "get_or_create", "groups", &e).await,
    };
    let is_admin = is_group_admin(bot, handler, &group, user_id).await;

    match handler.camps.add_camp_task(&group, user_id, args, Utc::now(), is_admin).await {
        Ok((camp, task)) => {
            log_command_success("addtask", &user, user_id, msg.chat.id.0, Some(&format!("task {}", task.id)));
            let when = task
                .scheduled_time()
                .map(|at| format_local(&at, group.tz(handler.config.timezone)))
                .unwrap_or_default();
            feedback
                .success(&format!(
                    "Task '{}' added to {} for {} (+{} points, {} minutes to join).",
                    task.title, camp.name, when, task.points, task.deadline_minutes
                ))
                .await?;
            Ok(())
        }
        Err(e) => reply_camp_error(&feedback, msg, "addtask", args, ADD_TASK_USAGE, e).await,
    }
}

/// `/camps`: active camps of the group, one join button each.
pub async fn handle_camps(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    if !require_group_chat(bot, msg).await? {
        return Ok(());
    }
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let listed = match ensure_group(handler, msg).await {
        Ok(group) => handler.camps.list_camps(&group).await.map(|camps| (group, camps)),
        Err(e) => Err(e),
    };
    let (group, camps) = match listed {
        Ok(listed) => listed,
        Err(e) => return report_db_error(bot, msg.chat.id, "find_active_by_group", "camps", &e).await,
    };

    if camps.is_empty() {
        feedback.info("No active camps. Admins can create one with /newcamp.").await?;
        return Ok(());
    }

    let tz = group.tz(handler.config.timezone);
    let now = Utc::now();
    let mut text = format!("🏕 {}\n", bold("Active camps"));
    let mut rows = Vec::new();
    for (camp, participants) in &camps {
        let ends = camp.ends_at().map(|at| format_local(&at, tz)).unwrap_or_default();
        text.push_str(&format!(
            "\n{} {}\n{}\n",
            bold(&format!("#{}", camp.id)),
            bold(&camp.name),
            escape_markdown(&format!(
                "👥 {} joined · {}% done · ends {}",
                participants,
                camp.progress_percent(now),
                ends
            )),
        ));
        rows.push(vec![InlineKeyboardButton::callback(
            format!("{} #{}", JOIN_CAMP_BUTTON, camp.id),
            CallbackAction::JoinCamp(camp.id).to_string(),
        )]);
    }

    feedback
        .send_markdown_with_keyboard(text, InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// `/campreport <id>`: the daily report, on demand.
pub async fn handle_camp_report(bot: &Bot, msg: &Message, handler: &BotHandler, raw_id: &str) -> ResponseResult<()> {
    if !require_group_chat(bot, msg).await? {
        return Ok(());
    }
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (_, user_id) = sender(msg);

    let Ok(camp_id) = raw_id.trim().parse::<i64>() else {
        log_validation_error("campreport", raw_id, "not a camp id", user_id, msg.chat.id.0);
        feedback
            .validation_error("Missing or invalid camp id.", "Example: /campreport 3 (see /camps for ids)")
            .await?;
        return Ok(());
    };

    let found = match ensure_group(handler, msg).await {
        Ok(group) => Camp::find_by_id(&handler.db.pool, camp_id)
            .await
            .map(|camp| camp.filter(|camp| camp.group_id == group.id).map(|camp| (group, camp))),
        Err(e) => Err(e),
    };
    let (group, camp) = match found {
        Ok(Some(found)) => found,
        Ok(None) => {
            feedback.error(&format!("Camp {camp_id} was not found in this group.")).await?;
            return Ok(());
        }
        Err(e) => return report_db_error(bot, msg.chat.id, "find_by_id", "camps", &e).await,
    };

    match camp_report(&handler.db, &camp, Utc::now(), group.tz(handler.config.timezone)).await {
        Ok(text) => {
            feedback.send_markdown(text).await?;
            Ok(())
        }
        Err(e) => report_db_error(bot, msg.chat.id, "camp_report", "camps", &e).await,
    }
}

/// `/leavecamp <id>`: stop being counted in a camp. Points earned so far are kept.
pub async fn handle_leave_camp(bot: &Bot, msg: &Message, handler: &BotHandler, raw_id: &str) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender(msg);

    let Ok(camp_id) = raw_id.trim().parse::<i64>() else {
        log_validation_error("leavecamp", raw_id, "not a camp id", user_id, msg.chat.id.0);
        feedback
            .validation_error("Missing or invalid camp id.", "Example: /leavecamp 3 (see /camps for ids)")
            .await?;
        return Ok(());
    };

    match handler.participation.leave_camp(camp_id, user_id, Utc::now()).await {
        Ok(departure) => {
            refresh_announcement(handler, &departure.camp).await;
            log_command_success("leavecamp", &user, user_id, msg.chat.id.0, Some(&format!("camp {camp_id}")));
            feedback
                .success(&format!(
                    "You left {}. Your camp points are kept if you join again.",
                    departure.camp.name
                ))
                .await?;
        }
        Err(ParticipationError::Database(e)) => {
            return report_db_error(bot, msg.chat.id, "leave_camp", "camp_participants", &e).await;
        }
        Err(e) => {
            feedback.send_markdown(escape_markdown(e.user_message())).await?;
        }
    }
    Ok(())
}

/// Redraws a camp announcement with the current participant count.
pub async fn refresh_announcement(handler: &BotHandler, camp: &Camp) {
    let Some(message_id) = camp.announcement_message_id else {
        return;
    };

    let refreshed = async {
        let group = Group::find_by_id(&handler.db.pool, camp.group_id).await?;
        let participants = CampParticipant::count_active(&handler.db.pool, camp.id).await?;
        Ok::<_, sqlx::Error>(group.map(|group| (group, participants)))
    }
    .await;

    let (group, participants) = match refreshed {
        Ok(Some(found)) => found,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!("Could not load camp {} for its announcement: {}", camp.id, e);
            return;
        }
    };

    let text = camp_announcement(camp, participants, group.tz(handler.config.timezone));
    if let Err(e) = handler
        .notifier
        .edit_with_button(
            group.telegram_chat_id,
            message_id as i32,
            text,
            JOIN_CAMP_BUTTON.to_string(),
            CallbackAction::JoinCamp(camp.id).to_string(),
        )
        .await
    {
        tracing::debug!("Announcement of camp {} not updated: {}", camp.id, e);
    }
}
