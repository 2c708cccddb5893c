use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::{BotHandler, HandlerResult};
use crate::bot::commands::{admin, camps, schedule, sender, settings, stats, Command};
use crate::schedule::ScheduleType;
use crate::utils::logging::log_command_start;

const WELCOME: &str = "📚 Welcome to the study bot!\n\n\
    In private chat, follow a daily plan with /morning or /evening and get a reminder for every task.\n\
    In groups, admins enable schedules and camps, and members join tasks with the button under each post.\n\n\
    Use /help to see all commands.";

pub async fn command_handler(bot: Bot, msg: Message, cmd: Command, handler: BotHandler) -> HandlerResult {
    let (user, user_id) = sender(&msg);
    log_command_start(&format!("{cmd:?}"), &user, user_id, msg.chat.id.0, None);

    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Start => {
            bot.send_message(msg.chat.id, WELCOME).await?;
        }
        Command::Morning => schedule::handle_schedule_command(&bot, &msg, &handler, ScheduleType::Morning).await?,
        Command::Evening => schedule::handle_schedule_command(&bot, &msg, &handler, ScheduleType::Evening).await?,
        Command::Stop => schedule::handle_stop(&bot, &msg, &handler).await?,
        Command::Custom(args) => schedule::handle_custom(&bot, &msg, &handler, &args).await?,
        Command::Today => schedule::handle_today(&bot, &msg, &handler).await?,
        Command::Done(key) => schedule::handle_done(&bot, &msg, &handler, &key).await?,
        Command::Points => stats::handle_points(&bot, &msg, &handler).await?,
        Command::Ranking => stats::handle_ranking(&bot, &msg, &handler).await?,
        Command::Motivation => stats::handle_motivation(&bot, &msg).await?,
        Command::Settings => settings::handle_settings(&bot, &msg, &handler).await?,
        Command::Timezone(name) => settings::handle_timezone(&bot, &msg, &handler, &name).await?,
        Command::NewCamp(args) => camps::handle_new_camp(&bot, &msg, &handler, &args).await?,
        Command::AddTask(args) => camps::handle_add_task(&bot, &msg, &handler, &args).await?,
        Command::Camps => camps::handle_camps(&bot, &msg, &handler).await?,
        Command::CampReport(id) => camps::handle_camp_report(&bot, &msg, &handler, &id).await?,
        Command::LeaveCamp(id) => camps::handle_leave_camp(&bot, &msg, &handler, &id).await?,
        Command::Broadcast(text) => admin::handle_broadcast(&bot, &msg, &handler, &text).await?,
        Command::Stats => admin::handle_stats(&bot, &msg, &handler).await?,
    }

    Ok(())
}
