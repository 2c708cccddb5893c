use async_trait::async_trait;
use mockall::automock;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode},
};

use crate::error::NotifyError;

type Result<T> = std::result::Result<T, NotifyError>;

/// Outbound messaging used by the background jobs.
///
/// All text is MarkdownV2. Send methods return the id of the posted message.
#[automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts plain text to a chat.
    async fn send_text(&self, chat_id: i64, text: String) -> Result<i32>;

    /// Posts text with a single inline button under it.
    async fn send_with_button(
        &self,
        chat_id: i64,
        text: String,
        button_text: String,
        callback_data: String,
    ) -> Result<i32>;

    /// Replaces the text of an earlier message, keeping a single button.
    async fn edit_with_button(
        &self,
        chat_id: i64,
        message_id: i32,
        text: String,
        button_text: String,
        callback_data: String,
    ) -> Result<()>;
}

fn single_button(button_text: String, callback_data: String) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(button_text, callback_data)]])
}

/// [`Notifier`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, chat_id: i64, text: String) -> Result<i32> {
        let message = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(message.id.0)
    }

    async fn send_with_button(
        &self,
        chat_id: i64,
        text: String,
        button_text: String,
        callback_data: String,
    ) -> Result<i32> {
        let message = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(single_button(button_text, callback_data))
            .await?;
        Ok(message.id.0)
    }

    async fn edit_with_button(
        &self,
        chat_id: i64,
        message_id: i32,
        text: String,
        button_text: String,
        callback_data: String,
    ) -> Result<()> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(single_button(button_text, callback_data))
            .await?;
        Ok(())
    }
}
