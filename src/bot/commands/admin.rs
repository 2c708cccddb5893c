use chrono::Utc;
use teloxide::prelude::*;

use super::{report_db_error, sender};
use crate::bot::handlers::BotHandler;
use crate::services::admin::{broadcast, broadcast_summary, collect_usage_report};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_success};

const BROADCAST_USAGE: &str = "/broadcast Exams start on Sunday, good luck everyone!";

/// Replies and returns false unless the sender is listed in ADMIN_IDS.
async fn require_bot_admin(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<bool> {
    let (user, user_id) = sender(msg);
    if handler.config.is_global_admin(user_id) {
        return Ok(true);
    }

    log_command_error("admin", &user, user_id, msg.chat.id.0, "not a bot admin");
    CommandFeedback::new(bot.clone(), msg.chat.id)
        .error("This command is only available to bot admins.")
        .await?;
    Ok(false)
}

/// `/broadcast <text>`: private message to every active user.
pub async fn handle_broadcast(bot: &Bot, msg: &Message, handler: &BotHandler, text: &str) -> ResponseResult<()> {
    if !require_bot_admin(bot, msg, handler).await? {
        return Ok(());
    }

    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    if text.trim().is_empty() {
        feedback
            .send_command_help("/broadcast", "Send a message to every active user.", &[BROADCAST_USAGE])
            .await?;
        return Ok(());
    }

    feedback.send_processing("Sending the broadcast...").await?;
    match broadcast(&handler.db, &handler.notifier, text, Utc::now()).await {
        Ok(report) => {
            let (user, user_id) = sender(msg);
            log_command_success("broadcast", &user, user_id, msg.chat.id.0, Some(&format!("{report:?}")));
            feedback.success(&broadcast_summary(&report)).await?;
            Ok(())
        }
        Err(e) => report_db_error(bot, msg.chat.id, "broadcast", "users", &e).await,
    }
}

/// `/stats`: user and schedule head counts.
pub async fn handle_stats(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    if !require_bot_admin(bot, msg, handler).await? {
        return Ok(());
    }

    match collect_usage_report(&handler.db, Utc::now(), handler.config.timezone).await {
        Ok(text) => {
            CommandFeedback::new(bot.clone(), msg.chat.id).send_markdown(text).await?;
            Ok(())
        }
        Err(e) => report_db_error(bot, msg.chat.id, "usage_counts", "users", &e).await,
    }
}
