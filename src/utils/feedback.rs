use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use crate::utils::markdown::{bold, code, escape_markdown};

#[derive(Debug, Clone, Copy)]
pub enum FeedbackType {
    Success,
    Warning,
    Error,
    Info,
    Processing,
}

impl FeedbackType {
    fn emoji(&self) -> &'static str {
        match self {
            FeedbackType::Success => "✅",
            FeedbackType::Warning => "⚠️",
            FeedbackType::Error => "❌",
            FeedbackType::Info => "ℹ️",
            FeedbackType::Processing => "⏳",
        }
    }

    fn format(&self, message: &str) -> String {
        format!("{} {}", self.emoji(), escape_markdown(message))
    }
}

/// Replies to the chat a command came from, always in MarkdownV2.
pub struct CommandFeedback {
    bot: Bot,
    chat_id: ChatId,
}

impl CommandFeedback {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub async fn send(&self, feedback_type: FeedbackType, message: &str) -> ResponseResult<Message> {
        self.send_markdown(feedback_type.format(message)).await
    }

    /// Sends text that is already valid MarkdownV2.
    pub async fn send_markdown(&self, text: String) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    pub async fn send_markdown_with_keyboard(
        &self,
        text: String,
        keyboard: InlineKeyboardMarkup,
    ) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboard)
            .await
    }

    pub async fn send_processing(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Processing, message).await
    }

    pub async fn update_message(
        &self,
        message_id: MessageId,
        feedback_type: FeedbackType,
        message: &str,
    ) -> ResponseResult<Message> {
        self.bot
            .edit_message_text(self.chat_id, message_id, feedback_type.format(message))
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    pub async fn success(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Success, message).await
    }

    pub async fn error(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Error, message).await
    }

    pub async fn warning(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Warning, message).await
    }

    pub async fn info(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Info, message).await
    }

    /// Usage card for a command called with missing arguments.
    pub async fn send_command_help(&self, command: &str, description: &str, examples: &[&str]) -> ResponseResult<Message> {
        self.send_markdown(command_help_text(command, description, examples)).await
    }

    /// Error line plus a hint on how to fix the input.
    pub async fn validation_error(&self, error: &str, suggestion: &str) -> ResponseResult<Message> {
        let message = format!(
            "{}\n\n💡 {} {}",
            FeedbackType::Error.format(error),
            bold("Suggestion:"),
            escape_markdown(suggestion)
        );
        self.send_markdown(message).await
    }
}

fn command_help_text(command: &str, description: &str, examples: &[&str]) -> String {
    let mut help_text = format!("{}\n\n{}\n", bold(command), escape_markdown(description));

    if !examples.is_empty() {
        help_text.push_str(&format!("\n{}\n", bold("Examples:")));
        for example in examples {
            help_text.push_str(&format!("• {}\n", code(example)));
        }
    }

    help_text
}

/// One status message that is edited in place while a slow command runs.
///
/// Each step is rendered as `text (n/total)`; the final edit drops the counter.
pub struct StatusMessage {
    feedback: CommandFeedback,
    message_id: Option<MessageId>,
    steps: (u32, u32),
}

impl StatusMessage {
    pub fn new(feedback: CommandFeedback, total_steps: u32) -> Self {
        Self { feedback, message_id: None, steps: (0, total_steps.max(1)) }
    }

    fn counted(&self, text: &str) -> String {
        format!("{} ({}/{})", text, self.steps.0, self.steps.1)
    }

    /// Posts the status message, or edits it when it already exists.
    pub async fn step(&mut self, text: &str) -> ResponseResult<()> {
        self.steps.0 = (self.steps.0 + 1).min(self.steps.1);
        let text = self.counted(text);
        match self.message_id {
            None => {
                let posted = self.feedback.send_processing(&text).await?;
                self.message_id = Some(posted.id);
            }
            Some(id) => {
                self.feedback.update_message(id, FeedbackType::Processing, &text).await?;
            }
        }
        Ok(())
    }

    /// Replaces the status with a final outcome. No-op if nothing was posted.
    pub async fn finish(self, outcome: FeedbackType, text: &str) -> ResponseResult<()> {
        if let Some(id) = self.message_id {
            self.feedback.update_message(id, outcome, text).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_and_warning_prefixes() {
        assert_eq!(FeedbackType::Processing.format("Saving"), "⏳ Saving");
        assert!(FeedbackType::Warning.format("Careful").starts_with("⚠️ "));
    }

    #[test]
    fn test_status_counter_text() {
        let feedback = CommandFeedback::new(Bot::new("0:test"), ChatId(1));
        let mut status = StatusMessage::new(feedback, 0);
        assert_eq!(status.counted("Creating"), "Creating (0/1)");
        status.steps.0 = 1;
        assert_eq!(status.counted("Posting"), "Posting (1/1)");
    }

    #[test]
    fn test_feedback_text_is_escaped() {
        assert_eq!(FeedbackType::Success.format("Joined camp #3!"), "✅ Joined camp \\#3\\!");
    }

    #[test]
    fn test_command_help_text() {
        let text = command_help_text("/campreport", "Show a camp report.", &["/campreport 4"]);
        assert!(text.starts_with("*/campreport*"));
        assert!(text.contains("Show a camp report\\."));
        assert!(text.contains("`/campreport 4`"));
    }
}
