use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;

use super::{BotHandler, HandlerResult};
use crate::database::models::Group;
use crate::services::motivation::random_quote;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_database_error, log_system_event};
use crate::utils::markdown::{bold, escape_markdown};

/// Registers a group when the bot is added, remembering who added it as the group admin.
/// When the bot leaves or is removed, the group stops receiving scheduled posts.
pub async fn bot_membership_handler(bot: Bot, update: ChatMemberUpdated, handler: BotHandler) -> HandlerResult {
    let kind = &update.new_chat_member.kind;
    if update.chat.is_private() {
        return Ok(());
    }
    if kind.is_left() || kind.is_banned() {
        match Group::deactivate(&handler.db.pool, update.chat.id.0).await {
            Ok(true) => log_system_event("Bot removed from group", Some(&format!("chat {}", update.chat.id.0))),
            Ok(false) => {}
            Err(e) => log_database_error("deactivate", "groups", &e.to_string(), None),
        }
        return Ok(());
    }
    if !(update.old_chat_member.kind.is_left() || update.old_chat_member.kind.is_banned()) {
        return Ok(());
    }

    let group = Group::get_or_create(
        &handler.db.pool,
        update.chat.id.0,
        update.chat.title(),
        Some(update.from.id.0 as i64),
        handler.config.timezone,
        Utc::now(),
    )
    .await;

    match group {
        Ok(group) => {
            log_system_event(
                "Bot added to group",
                Some(&format!("chat {} by {}", group.telegram_chat_id, update.from.id.0)),
            );
            let text = format!(
                "{}\n\n{}\n\n{}",
                bold("📚 Study bot activated!"),
                escape_markdown(
                    "Admins can enable daily schedules with /morning, /evening or /custom, \
                     and create study camps with /newcamp. See /help for everything else."
                ),
                escape_markdown(random_quote()),
            );
            CommandFeedback::new(bot, update.chat.id).send_markdown(text).await?;
        }
        Err(e) => log_database_error("get_or_create", "groups", &e.to_string(), None),
    }

    Ok(())
}
