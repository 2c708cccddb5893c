use chrono::Utc;
use teloxide::prelude::*;

use super::{BotHandler, HandlerResult};
use crate::bot::callback_data::CallbackAction;
use crate::bot::commands::{camps::refresh_announcement, settings::handle_settings_callback};
use crate::database::models::UserProfile;
use crate::error::ParticipationError;
use crate::services::participation::{CampJoinStatus, CampTaskJoinOutcome, TaskJoinOutcome};
use crate::utils::logging::{log_database_error, log_validation_error};

pub async fn callback_handler(bot: Bot, q: CallbackQuery, handler: BotHandler) -> HandlerResult {
    let user_id = q.from.id.0 as i64;
    let chat_id = q.message.as_ref().map(|m| m.chat.id.0).unwrap_or(0);

    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id.clone()).text("❌ Invalid button").await?;
        return Ok(());
    };

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            log_validation_error("callback", data, &e.to_string(), user_id, chat_id);
            bot.answer_callback_query(q.id.clone()).text("❌ Invalid button").await?;
            return Ok(());
        }
    };
    tracing::info!("Callback {} from user {} in chat {}", action, user_id, chat_id);

    let profile = UserProfile::from(&q.from);
    let now = Utc::now();

    let answer = match action {
        CallbackAction::JoinGroupTask(task_id) => {
            match handler.participation.join_group_task(task_id, &profile, now).await {
                Ok(outcome) => task_joined_text(&outcome),
                Err(e) => failure_text("join_group_task", e),
            }
        }
        CallbackAction::CompletePrivateTask {
            schedule_type,
            date,
            key,
        } => match handler
            .participation
            .complete_private_task(&profile, schedule_type, date, &key, now)
            .await
        {
            Ok(outcome) => task_joined_text(&outcome),
            Err(e) => failure_text("complete_private_task", e),
        },
        CallbackAction::JoinCamp(camp_id) => match handler.participation.join_camp(camp_id, &profile, now).await {
            Ok(membership) => {
                if membership.status != CampJoinStatus::AlreadyMember {
                    refresh_announcement(&handler, &membership.camp).await;
                }
                match membership.status {
                    CampJoinStatus::Joined => format!("🏕 Welcome to {}!", membership.camp.name),
                    CampJoinStatus::Rejoined => format!("🏕 Welcome back to {}!", membership.camp.name),
                    CampJoinStatus::AlreadyMember => format!("✅ You are already in {}", membership.camp.name),
                }
            }
            Err(e) => failure_text("join_camp", e),
        },
        CallbackAction::JoinCampTask(task_id) => {
            match handler.participation.join_camp_task(task_id, &profile, now).await {
                Ok(outcome) => {
                    if outcome.joined_camp {
                        refresh_announcement(&handler, &outcome.camp).await;
                    }
                    camp_task_joined_text(&outcome)
                }
                Err(e) => failure_text("join_camp_task", e),
            }
        }
        CallbackAction::Settings(toggle) => handle_settings_callback(&bot, &q, toggle, &handler).await?,
    };

    bot.answer_callback_query(q.id).text(answer).await?;
    Ok(())
}

fn task_joined_text(outcome: &TaskJoinOutcome) -> String {
    let mut text = format!(
        "✅ +{} points! Total {} · 🔥 {} day streak",
        outcome.points_awarded, outcome.total_points, outcome.streak_days
    );
    if let Some(bonus) = outcome.completion_bonus {
        text.push_str(&format!("\n🎉 Schedule complete (+{bonus} bonus)"));
    }
    text
}

fn camp_task_joined_text(outcome: &CampTaskJoinOutcome) -> String {
    let mut text = format!(
        "✅ +{} points in {}! Camp total {} · rank #{}",
        outcome.points_awarded, outcome.camp.name, outcome.camp_points, outcome.rank
    );
    if outcome.joined_camp {
        text.push_str("\n🏕 You also joined the camp");
    }
    text
}

fn failure_text(operation: &str, error: ParticipationError) -> String {
    if let ParticipationError::Database(e) = &error {
        log_database_error(operation, "participations", &e.to_string(), None);
    }
    error.user_message().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_joined_text_mentions_bonus() {
        let outcome = TaskJoinOutcome {
            points_awarded: 27,
            completion_bonus: Some(20),
            total_points: 140,
            streak_days: 4,
            participants: 3,
        };
        let text = task_joined_text(&outcome);
        assert!(text.starts_with("✅ +27 points"));
        assert!(text.contains("+20 bonus"));
    }

    #[test]
    fn test_failure_text_uses_user_message() {
        assert_eq!(
            failure_text("join_group_task", ParticipationError::WindowClosed),
            ParticipationError::WindowClosed.user_message()
        );
    }
}
