use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::{admin_group, is_group_admin, report_db_error, sender};
use crate::bot::callback_data::{CallbackAction, SettingsToggle};
use crate::bot::handlers::BotHandler;
use crate::database::models::Group;
use crate::schedule::ScheduleType;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_success, log_database_error, log_validation_error};
use crate::utils::markdown::{bold, code, escape_markdown};
use crate::utils::validation::parse_timezone;

fn toggle_label(name: &str, enabled: bool) -> String {
    format!("{} {}", if enabled { "✅" } else { "❌" }, name)
}

/// One button per setting, labelled with its current state.
pub fn settings_keyboard(group: &Group) -> InlineKeyboardMarkup {
    let schedule_row = |schedule_type: ScheduleType, name: &str| {
        vec![InlineKeyboardButton::callback(
            toggle_label(name, group.schedule_enabled(schedule_type)),
            CallbackAction::Settings(SettingsToggle::Schedule(schedule_type)).to_string(),
        )]
    };

    InlineKeyboardMarkup::new(vec![
        schedule_row(ScheduleType::Morning, "Morning schedule"),
        schedule_row(ScheduleType::Evening, "Evening schedule"),
        schedule_row(ScheduleType::Custom, "Custom schedule"),
        vec![InlineKeyboardButton::callback(
            toggle_label("Motivation quotes", group.motivation_enabled),
            CallbackAction::Settings(SettingsToggle::Motivation).to_string(),
        )],
    ])
}

fn settings_text(group: &Group) -> String {
    format!(
        "⚙️ {}\n\n{} {}\n\n{}",
        bold("Group settings"),
        escape_markdown("🕐 Timezone:"),
        code(&group.timezone),
        escape_markdown("Tap a button to switch it. Change the timezone with /timezone <Area/City>."),
    )
}

pub async fn handle_settings(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    let Some(group) = admin_group(bot, msg, handler).await? else {
        return Ok(());
    };

    CommandFeedback::new(bot.clone(), msg.chat.id)
        .send_markdown_with_keyboard(settings_text(&group), settings_keyboard(&group))
        .await?;
    Ok(())
}

pub async fn handle_timezone(bot: &Bot, msg: &Message, handler: &BotHandler, name: &str) -> ResponseResult<()> {
    let Some(group) = admin_group(bot, msg, handler).await? else {
        return Ok(());
    };
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender(msg);

    let tz = match parse_timezone(name) {
        Ok(tz) => tz,
        Err(e) => {
            log_validation_error("timezone", name, &e.to_string(), user_id, msg.chat.id.0);
            feedback
                .validation_error(&e.to_string(), "Use an IANA name such as Asia/Riyadh or Europe/Berlin.")
                .await?;
            return Ok(());
        }
    };

    if let Err(e) = Group::set_timezone(&handler.db.pool, group.id, tz).await {
        return report_db_error(bot, msg.chat.id, "set_timezone", "groups", &e).await;
    }

    log_command_success("timezone", &user, user_id, msg.chat.id.0, Some(tz.name()));
    feedback
        .success(&format!("Timezone set to {}. Schedules now follow local time there.", tz.name()))
        .await?;
    Ok(())
}

/// Applies a toggle pressed on the settings keyboard and redraws it.
pub async fn handle_settings_callback(
    bot: &Bot,
    q: &CallbackQuery,
    toggle: SettingsToggle,
    handler: &BotHandler,
) -> ResponseResult<String> {
    let Some(message) = q.message.as_ref() else {
        return Ok("❌ This keyboard has expired".to_string());
    };

    let group = match Group::find_by_chat_id(&handler.db.pool, message.chat.id.0).await {
        Ok(Some(group)) => group,
        Ok(None) => return Ok("❌ This chat is not registered".to_string()),
        Err(e) => {
            log_database_error("find_by_chat_id", "groups", &e.to_string(), None);
            return Ok("❌ Something went wrong, please try again".to_string());
        }
    };

    if !is_group_admin(bot, handler, &group, q.from.id.0 as i64).await {
        return Ok("🔒 Only group admins can change settings".to_string());
    }

    let updated = match toggle {
        SettingsToggle::Schedule(schedule_type) => {
            Group::set_schedule_enabled(
                &handler.db.pool,
                group.id,
                schedule_type,
                !group.schedule_enabled(schedule_type),
            )
            .await
        }
        SettingsToggle::Motivation => {
            Group::set_motivation_enabled(&handler.db.pool, group.id, !group.motivation_enabled).await
        }
    };

    let refreshed = match updated {
        Ok(()) => Group::find_by_id(&handler.db.pool, group.id).await,
        Err(e) => Err(e),
    };
    let group = match refreshed {
        Ok(Some(group)) => group,
        Ok(None) => return Ok("❌ This chat is not registered".to_string()),
        Err(e) => {
            log_database_error("toggle_setting", "groups", &e.to_string(), None);
            return Ok("❌ Something went wrong, please try again".to_string());
        }
    };

    bot.edit_message_reply_markup(message.chat.id, message.id)
        .reply_markup(settings_keyboard(&group))
        .await?;

    Ok("✅ Settings updated".to_string())
}
