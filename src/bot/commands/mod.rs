pub mod admin;
pub mod camps;
pub mod schedule;
pub mod settings;
pub mod stats;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::handlers::BotHandler;
use crate::database::models::Group;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::log_database_error;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Study bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Morning schedule: toggle in a group, follow privately")]
    Morning,
    #[command(description = "Evening schedule: toggle in a group, follow privately")]
    Evening,
    #[command(description = "Stop your private schedule")]
    Stop,
    #[command(description = "Set custom group slots: HH:MM Title, HH:MM Title")]
    Custom(String),
    #[command(description = "Show today's progress")]
    Today,
    #[command(description = "Mark a task of your schedule as done")]
    Done(String),
    #[command(description = "Show your points, level and streak")]
    Points,
    #[command(description = "Show the group leaderboard")]
    Ranking,
    #[command(description = "Get a motivational quote")]
    Motivation,
    #[command(description = "Configure group schedules")]
    Settings,
    #[command(description = "Set the group timezone, e.g. Europe/Berlin")]
    Timezone(String),
    #[command(description = "Create a study camp")]
    NewCamp(String),
    #[command(description = "Add a task to a camp")]
    AddTask(String),
    #[command(description = "List active camps")]
    Camps,
    #[command(description = "Send a camp report now")]
    CampReport(String),
    #[command(description = "Leave a study camp")]
    LeaveCamp(String),
    #[command(description = "Bot admins: message every active user")]
    Broadcast(String),
    #[command(description = "Bot admins: user statistics")]
    Stats,
}

/// Who sent a command, as the logging helpers want it.
pub(crate) fn sender(msg: &Message) -> (String, i64) {
    match msg.from() {
        Some(user) => (
            user.username.clone().unwrap_or_else(|| user.first_name.clone()),
            user.id.0 as i64,
        ),
        None => ("unknown".to_string(), 0),
    }
}

/// Loads the group for a group chat, registering it on first use.
pub(crate) async fn ensure_group(handler: &BotHandler, msg: &Message) -> Result<Group, sqlx::Error> {
    Group::get_or_create(
        &handler.db.pool,
        msg.chat.id.0,
        msg.chat.title(),
        None,
        handler.config.timezone,
        Utc::now(),
    )
    .await
}

/// Global admins, the stored group admin, and Telegram chat administrators qualify.
pub(crate) async fn is_group_admin(bot: &Bot, handler: &BotHandler, group: &Group, user_id: i64) -> bool {
    if handler.config.is_global_admin(user_id) || group.admin_id == Some(user_id) {
        return true;
    }

    match bot
        .get_chat_member(ChatId(group.telegram_chat_id), UserId(user_id as u64))
        .await
    {
        Ok(member) => member.kind.is_owner() || member.kind.is_administrator(),
        Err(e) => {
            tracing::warn!("Could not check admin rights of {} in {}: {}", user_id, group.telegram_chat_id, e);
            false
        }
    }
}

/// Logs a failed query and tells the chat something went wrong.
pub(crate) async fn report_db_error(
    bot: &Bot,
    chat_id: ChatId,
    operation: &str,
    table: &str,
    error: &sqlx::Error,
) -> ResponseResult<()> {
    log_database_error(operation, table, &error.to_string(), Some(&format!("chat {}", chat_id.0)));
    CommandFeedback::new(bot.clone(), chat_id)
        .error("Something went wrong, please try again later.")
        .await?;
    Ok(())
}

pub(crate) async fn require_group_chat(bot: &Bot, msg: &Message) -> ResponseResult<bool> {
    if msg.chat.is_private() {
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .warning("This command only works in groups.")
            .await?;
        return Ok(false);
    }
    Ok(true)
}

/// Loads the group and checks the sender's admin rights, replying when either fails.
pub(crate) async fn admin_group(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<Option<Group>> {
    if !require_group_chat(bot, msg).await? {
        return Ok(None);
    }

    let group = match ensure_group(handler, msg).await {
        Ok(group) => group,
        Err(e) => {
            report_db_error(bot, msg.chat.id, "get_or_create", "groups", &e).await?;
            return Ok(None);
        }
    };

    let (_, user_id) = sender(msg);
    if !is_group_admin(bot, handler, &group, user_id).await {
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .error("Only group admins can do that.")
            .await?;
        return Ok(None);
    }

    Ok(Some(group))
}
