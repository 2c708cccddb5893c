use teloxide::prelude::*;

use super::{ensure_group, report_db_error, require_group_chat, sender};
use crate::bot::handlers::BotHandler;
use crate::database::models::User;
use crate::services::motivation::random_quote;
use crate::services::reports::group_leaderboard;
use crate::utils::feedback::CommandFeedback;
use crate::utils::markdown::{bold, escape_markdown};

pub async fn handle_points(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    let (_, user_id) = sender(msg);
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let user = match User::find_by_telegram_id(&handler.db.pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            feedback
                .info("No points yet. Join a task or start a schedule with /morning or /evening.")
                .await?;
            return Ok(());
        }
        Err(e) => return report_db_error(bot, msg.chat.id, "find_by_telegram_id", "users", &e).await,
    };

    feedback.send_markdown(points_card(&user)).await?;
    Ok(())
}

fn points_card(user: &User) -> String {
    let level = user.level();
    let next = match level.next_threshold() {
        Some(threshold) => format!("{} points to the next level", threshold - user.total_points),
        None => "Top level reached".to_string(),
    };

    format!(
        "{} {}\n\n{}\n\n{}",
        level.emoji(),
        bold(&format!("{}: {}", user.display_name(), level.name())),
        escape_markdown(&format!(
            "⭐ Total: {}\n🌅 Morning: {}\n🌙 Evening: {}\n🗓 Custom: {}\n🏕 Camps: {}\n✅ Tasks done: {}\n🔥 Streak: {} days",
            user.total_points,
            user.morning_points,
            user.evening_points,
            user.custom_points,
            user.camp_points,
            user.total_tasks_completed,
            user.streak_days
        )),
        escape_markdown(&next),
    )
}

pub async fn handle_ranking(bot: &Bot, msg: &Message, handler: &BotHandler) -> ResponseResult<()> {
    if !require_group_chat(bot, msg).await? {
        return Ok(());
    }

    let text = async {
        let group = ensure_group(handler, msg).await?;
        group_leaderboard(&handler.db, &group).await
    }
    .await;

    match text {
        Ok(text) => {
            CommandFeedback::new(bot.clone(), msg.chat.id).send_markdown(text).await?;
            Ok(())
        }
        Err(e) => report_db_error(bot, msg.chat.id, "leaderboard", "group_participants", &e).await,
    }
}

pub async fn handle_motivation(bot: &Bot, msg: &Message) -> ResponseResult<()> {
    CommandFeedback::new(bot.clone(), msg.chat.id)
        .send_markdown(escape_markdown(random_quote()))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(total_points: i64) -> User {
        User {
            id: 1,
            telegram_id: 42,
            username: Some("noor".to_string()),
            first_name: Some("Noor".to_string()),
            preferred_schedule: "morning".to_string(),
            is_active: true,
            total_points,
            morning_points: total_points,
            evening_points: 0,
            custom_points: 0,
            camp_points: 0,
            streak_days: 3,
            last_streak_date: None,
            total_tasks_completed: 7,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_points_card_shows_level_progress() {
        let card = points_card(&user(80));
        assert!(card.contains("Active"));
        assert!(card.contains("20 points to the next level"));
        assert!(card.contains("Streak: 3 days"));
    }

    #[test]
    fn test_points_card_at_top_level() {
        assert!(points_card(&user(1500)).contains("Top level reached"));
    }
}
